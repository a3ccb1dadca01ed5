//! Shared error types for the services crate.

use thiserror::Error;

use lms_core::model::{CourseId, LessonId};
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

/// Errors emitted while talking to a catalog source.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SyncError {
    #[error("remote catalog is not configured")]
    Disabled,
    #[error("{message}")]
    Rejected {
        status: reqwest::StatusCode,
        message: String,
    },
    #[error("catalog response could not be decoded: {0}")]
    Decode(String),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

impl SyncError {
    /// True for 401/403 rejections.
    #[must_use]
    pub fn is_auth_failure(&self) -> bool {
        matches!(
            self,
            SyncError::Rejected { status, .. }
                if *status == reqwest::StatusCode::UNAUTHORIZED
                    || *status == reqwest::StatusCode::FORBIDDEN
        )
    }
}

/// Errors emitted by `ProgressService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProgressError {
    #[error("course {0} is not in the catalog")]
    UnknownCourse(CourseId),
    #[error("lesson {lesson_id} does not belong to course {course_id}")]
    UnknownLesson {
        course_id: CourseId,
        lesson_id: LessonId,
    },
    #[error("lesson {0} is not a quiz")]
    NotAQuiz(LessonId),
    #[error("lesson {0} is a quiz and completes only by passing it")]
    QuizRequiresSubmission(LessonId),
    #[error("lesson {lesson_id} is locked until {remaining} earlier lesson(s) are completed")]
    LessonLocked {
        lesson_id: LessonId,
        remaining: usize,
    },
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `CatalogService` and `CatalogCache`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CatalogError {
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Forbidden")]
    Forbidden,
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Remote(#[from] SyncError),
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("invalid remote catalog url: {0}")]
    RemoteUrl(String),
}
