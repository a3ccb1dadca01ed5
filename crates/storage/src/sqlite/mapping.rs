use std::collections::BTreeSet;

use lms_core::model::{Course, CourseId, LessonId, Level, Module, UserCourseProgress};
use serde::de::DeserializeOwned;
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use crate::repository::StorageError;

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn u32_from_i64(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} out of range: {v}")))
}

pub(crate) fn to_json<T: serde::Serialize>(value: &T) -> Result<String, StorageError> {
    serde_json::to_string(value).map_err(ser)
}

/// Decodes an embedded JSON column, falling back to the default on malformed data.
fn lenient_json<T: DeserializeOwned + Default>(raw: &str, column: &'static str, owner: &str) -> T {
    serde_json::from_str(raw).unwrap_or_else(|err| {
        tracing::warn!(column, owner, error = %err, "malformed stored document; using empty default");
        T::default()
    })
}

pub(crate) fn course_from_row(row: &SqliteRow) -> Result<Course, StorageError> {
    let id: String = row.try_get("id").map_err(ser)?;
    let modules_raw: String = row.try_get("modules_list").map_err(ser)?;
    let prerequisites_raw: String = row.try_get("prerequisites").map_err(ser)?;
    let level: String = row.try_get("level").map_err(ser)?;

    let modules_list: Vec<Module> = lenient_json(&modules_raw, "modules_list", &id);
    let prerequisites: Vec<CourseId> = lenient_json(&prerequisites_raw, "prerequisites", &id);

    Ok(Course {
        title: row.try_get("title").map_err(ser)?,
        description: row.try_get("description").map_err(ser)?,
        level: Level::parse_lenient(&level),
        category: row.try_get("category").map_err(ser)?,
        duration: row.try_get("duration").map_err(ser)?,
        modules: u32_from_i64("modules", row.try_get("modules").map_err(ser)?)?,
        progress: u32_from_i64("progress", row.try_get("progress").map_err(ser)?)?,
        modules_list,
        prerequisites,
        id: CourseId::new(id),
    })
}

/// Maps a progress row. Returns `None` when the stored lesson set cannot be decoded;
/// such a record counts as "nothing completed yet".
pub(crate) fn progress_from_row(
    row: &SqliteRow,
) -> Result<Option<(CourseId, UserCourseProgress)>, StorageError> {
    let course_id: String = row.try_get("course_id").map_err(ser)?;
    let raw: String = row.try_get("completed_lesson_ids").map_err(ser)?;

    let completed_lesson_ids: BTreeSet<LessonId> = match serde_json::from_str(&raw) {
        Ok(ids) => ids,
        Err(err) => {
            tracing::warn!(course_id, error = %err, "dropping unreadable progress record");
            return Ok(None);
        }
    };

    let final_score = row
        .try_get::<Option<i64>, _>("final_score")
        .map_err(ser)?
        .and_then(|v| u8::try_from(v).ok())
        .map(|v| v.min(100));
    let final_passed = row
        .try_get::<Option<i64>, _>("final_passed")
        .map_err(ser)?
        .map(|v| v != 0);

    Ok(Some((
        CourseId::new(course_id),
        UserCourseProgress {
            completed_lesson_ids,
            final_score,
            final_passed,
        },
    )))
}
