use std::collections::HashSet;

use chrono::{DateTime, Utc};
use lms_core::model::{Course, CourseId};

use super::SqliteRepository;
use super::mapping::{course_from_row, to_json};
use crate::repository::{CourseRepository, ReplaceSummary, StorageError};

fn conn<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

#[async_trait::async_trait]
impl CourseRepository for SqliteRepository {
    async fn list_courses(&self) -> Result<Vec<Course>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id, title, description, level, category, duration, modules, progress,
                   modules_list, prerequisites
            FROM courses
            ORDER BY created_at ASC, rowid ASC
            ",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        let mut courses = Vec::with_capacity(rows.len());
        for row in rows {
            courses.push(course_from_row(&row)?);
        }
        Ok(courses)
    }

    async fn get_course(&self, id: &CourseId) -> Result<Option<Course>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT id, title, description, level, category, duration, modules, progress,
                   modules_list, prerequisites
            FROM courses WHERE id = ?1
            ",
        )
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?;

        row.as_ref().map(course_from_row).transpose()
    }

    async fn replace_catalog(
        &self,
        courses: &[Course],
        now: DateTime<Utc>,
    ) -> Result<ReplaceSummary, StorageError> {
        let incoming: HashSet<&str> = courses.iter().map(|c| c.id.as_str()).collect();

        // Serialize up front so a bad document fails before the transaction opens.
        let mut encoded = Vec::with_capacity(courses.len());
        for course in courses {
            encoded.push((
                course,
                to_json(&course.modules_list)?,
                to_json(&course.prerequisites)?,
            ));
        }

        let mut tx = self.pool.begin().await.map_err(conn)?;

        let existing: Vec<String> = sqlx::query_scalar("SELECT id FROM courses")
            .fetch_all(&mut *tx)
            .await
            .map_err(conn)?;

        let mut summary = ReplaceSummary::default();
        for id in existing.iter().filter(|id| !incoming.contains(id.as_str())) {
            sqlx::query("DELETE FROM courses WHERE id = ?1")
                .bind(id)
                .execute(&mut *tx)
                .await
                .map_err(conn)?;
            summary.deleted += 1;
        }

        // Repeated ids in the input count once as created, then as updates.
        let mut known: HashSet<String> = existing.into_iter().collect();
        for (course, modules_list, prerequisites) in encoded {
            sqlx::query(
                r"
                INSERT INTO courses (
                    id, title, description, level, category, duration, modules, progress,
                    modules_list, prerequisites, created_at, updated_at
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?11)
                ON CONFLICT(id) DO UPDATE SET
                    -- created_at is kept so catalog order survives edits
                    title = excluded.title,
                    description = excluded.description,
                    level = excluded.level,
                    category = excluded.category,
                    duration = excluded.duration,
                    modules = excluded.modules,
                    progress = excluded.progress,
                    modules_list = excluded.modules_list,
                    prerequisites = excluded.prerequisites,
                    updated_at = excluded.updated_at
                ",
            )
            .bind(course.id.as_str())
            .bind(&course.title)
            .bind(&course.description)
            .bind(course.level.as_str())
            .bind(&course.category)
            .bind(&course.duration)
            .bind(i64::from(course.modules))
            .bind(i64::from(course.progress))
            .bind(modules_list)
            .bind(prerequisites)
            .bind(now)
            .execute(&mut *tx)
            .await
            .map_err(conn)?;

            if known.insert(course.id.as_str().to_owned()) {
                summary.created += 1;
            } else {
                summary.updated += 1;
            }
        }

        tx.commit().await.map_err(conn)?;
        Ok(summary)
    }
}
