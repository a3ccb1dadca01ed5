use lms_core::model::{ProgressMap, UserId};

use super::SqliteRepository;
use super::mapping::{progress_from_row, to_json};
use crate::repository::{ProgressRepository, StorageError};

fn conn<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

#[async_trait::async_trait]
impl ProgressRepository for SqliteRepository {
    async fn load_progress(&self, user_id: &UserId) -> Result<ProgressMap, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT course_id, completed_lesson_ids, final_score, final_passed
            FROM course_progress
            WHERE user_id = ?1
            ORDER BY course_id ASC
            ",
        )
        .bind(user_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        let mut map = ProgressMap::new();
        for row in rows {
            if let Some((course_id, progress)) = progress_from_row(&row)? {
                map.insert(course_id, progress);
            }
        }
        Ok(map)
    }

    async fn save_progress(&self, user_id: &UserId, map: &ProgressMap) -> Result<(), StorageError> {
        let mut encoded = Vec::with_capacity(map.len());
        for (course_id, progress) in map.iter() {
            encoded.push((course_id, progress, to_json(&progress.completed_lesson_ids)?));
        }

        let mut tx = self.pool.begin().await.map_err(conn)?;

        sqlx::query("DELETE FROM course_progress WHERE user_id = ?1")
            .bind(user_id.as_str())
            .execute(&mut *tx)
            .await
            .map_err(conn)?;

        for (course_id, progress, completed) in encoded {
            sqlx::query(
                r"
                INSERT INTO course_progress (
                    user_id, course_id, completed_lesson_ids, final_score, final_passed
                )
                VALUES (?1, ?2, ?3, ?4, ?5)
                ",
            )
            .bind(user_id.as_str())
            .bind(course_id.as_str())
            .bind(completed)
            .bind(progress.final_score.map(|s| i64::from(s.min(100))))
            .bind(progress.final_passed.map(i64::from))
            .execute(&mut *tx)
            .await
            .map_err(conn)?;
        }

        tx.commit().await.map_err(conn)?;
        tracing::debug!(user_id = %user_id, courses = map.len(), "saved progress");
        Ok(())
    }
}
