use chrono::Utc;
use sqlx::SqlitePool;

use super::SqliteInitError;

/// Runs the schema migrations that have not been applied yet.
///
/// Courses are stored as one row each with the module/lesson tree embedded as a
/// JSON document. Progress is one row per (user, course).
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), SqliteInitError> {
    async fn is_applied(pool: &SqlitePool, version: i64) -> Result<bool, sqlx::Error> {
        let row = sqlx::query("SELECT 1 FROM schema_migrations WHERE version = ?1")
            .bind(version)
            .fetch_optional(pool)
            .await?;
        Ok(row.is_some())
    }

    sqlx::query(
        r"
            CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            );
            ",
    )
    .execute(pool)
    .await?;

    if !is_applied(pool, 1).await? {
        let mut tx = pool.begin().await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS courses (
                    id TEXT PRIMARY KEY,
                    title TEXT NOT NULL DEFAULT '',
                    description TEXT NOT NULL DEFAULT '',
                    level TEXT NOT NULL DEFAULT 'Beginner',
                    category TEXT NOT NULL DEFAULT '',
                    duration TEXT NOT NULL DEFAULT '',
                    modules INTEGER NOT NULL DEFAULT 0 CHECK (modules >= 0),
                    progress INTEGER NOT NULL DEFAULT 0 CHECK (progress >= 0),
                    modules_list TEXT NOT NULL DEFAULT '[]',
                    prerequisites TEXT NOT NULL DEFAULT '[]',
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS course_progress (
                    user_id TEXT NOT NULL,
                    course_id TEXT NOT NULL,
                    completed_lesson_ids TEXT NOT NULL DEFAULT '[]',
                    final_score INTEGER CHECK (final_score BETWEEN 0 AND 100),
                    final_passed INTEGER CHECK (final_passed IN (0, 1)),
                    PRIMARY KEY (user_id, course_id)
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS cache_slots (
                    key TEXT PRIMARY KEY,
                    value TEXT NOT NULL,
                    written_at TEXT NOT NULL
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE INDEX IF NOT EXISTS idx_courses_created
                    ON courses (created_at);
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                INSERT INTO schema_migrations (version, applied_at)
                VALUES (?1, ?2)
                ON CONFLICT(version) DO NOTHING
            ",
        )
        .bind(1_i64)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        tracing::info!(version = 1, "applied schema migration");
    }

    Ok(())
}
