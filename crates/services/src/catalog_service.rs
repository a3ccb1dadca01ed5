use std::sync::Arc;

use lms_core::authoring::lint_course;
use lms_core::model::Course;
use serde_json::Value;
use storage::repository::{CourseRepository, ReplaceSummary};

use crate::Clock;
use crate::error::CatalogError;
use crate::identity::{Principal, require_admin};
use crate::normalize::normalize_catalog_payload;

/// Authoritative catalog: public reads, admin-only full-catalog replacement.
#[derive(Clone)]
pub struct CatalogService {
    clock: Clock,
    courses: Arc<dyn CourseRepository>,
}

impl CatalogService {
    #[must_use]
    pub fn new(clock: Clock, courses: Arc<dyn CourseRepository>) -> Self {
        Self { clock, courses }
    }

    /// Every course in creation order.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Storage` if the catalog cannot be read.
    pub async fn fetch_catalog(&self) -> Result<Vec<Course>, CatalogError> {
        let courses = self.courses.list_courses().await?;
        tracing::debug!(count = courses.len(), "fetched catalog");
        Ok(courses)
    }

    /// Replace the whole catalog with `courses`.
    ///
    /// Courses missing from `courses` are deleted and the rest are upserted by id,
    /// atomically. Concurrent writers are last-write-wins. Authoring lint findings
    /// are logged, never rejected.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Unauthorized` / `CatalogError::Forbidden` before
    /// touching storage when `principal` is missing or not an admin.
    /// Returns `CatalogError::Storage` if the transaction fails.
    pub async fn replace_catalog(
        &self,
        principal: Option<&Principal>,
        courses: &[Course],
    ) -> Result<ReplaceSummary, CatalogError> {
        let admin = require_admin(principal)?;

        for course in courses {
            for issue in lint_course(course) {
                tracing::warn!(course_id = %course.id, %issue, "catalog lint");
            }
        }

        let summary = self
            .courses
            .replace_catalog(courses, self.clock.now())
            .await?;
        tracing::info!(
            admin = %admin.user_id(),
            created = summary.created,
            updated = summary.updated,
            deleted = summary.deleted,
            "catalog replaced"
        );
        Ok(summary)
    }

    /// Replace the catalog from a raw `{ "courses": [...] }` payload.
    ///
    /// The payload is coerced leniently; a non-list `courses` field replaces the
    /// catalog with nothing.
    ///
    /// # Errors
    ///
    /// Same as [`CatalogService::replace_catalog`].
    pub async fn replace_catalog_payload(
        &self,
        principal: Option<&Principal>,
        payload: &Value,
    ) -> Result<ReplaceSummary, CatalogError> {
        require_admin(principal)?;
        let courses = normalize_catalog_payload(payload);
        self.replace_catalog(principal, &courses).await
    }
}
