use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lms_core::model::{Course, CourseId, ProgressMap, UserId};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// What a catalog replacement changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReplaceSummary {
    pub deleted: usize,
    pub created: usize,
    pub updated: usize,
}

/// Authoritative course catalog.
#[async_trait]
pub trait CourseRepository: Send + Sync {
    /// Every course in creation order.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the catalog cannot be read or decoded.
    async fn list_courses(&self) -> Result<Vec<Course>, StorageError>;

    /// Fetch a course by ID. `Ok(None)` when it does not exist.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn get_course(&self, id: &CourseId) -> Result<Option<Course>, StorageError>;

    /// Replace the whole catalog in one transaction.
    ///
    /// Courses whose id is absent from `courses` are deleted; every incoming course
    /// is upserted by id. Existing courses keep their creation time and position.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if any statement fails; nothing is applied in that case.
    async fn replace_catalog(
        &self,
        courses: &[Course],
        now: DateTime<Utc>,
    ) -> Result<ReplaceSummary, StorageError>;
}

/// Per-user progress records.
#[async_trait]
pub trait ProgressRepository: Send + Sync {
    /// Stored map for the user, empty when nothing has been saved yet.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn load_progress(&self, user_id: &UserId) -> Result<ProgressMap, StorageError>;

    /// Replace the user's stored map.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the map cannot be stored.
    async fn save_progress(&self, user_id: &UserId, map: &ProgressMap) -> Result<(), StorageError>;
}

/// Named key-value slots holding serialized client-side caches.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn read_slot(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn write_slot(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn clear_slot(&self, key: &str) -> Result<(), StorageError>;
}

fn lock_err<E: std::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    courses: Arc<Mutex<Vec<Course>>>,
    progress: Arc<Mutex<HashMap<UserId, ProgressMap>>>,
    slots: Arc<Mutex<HashMap<String, String>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CourseRepository for InMemoryRepository {
    async fn list_courses(&self) -> Result<Vec<Course>, StorageError> {
        let guard = self.courses.lock().map_err(lock_err)?;
        Ok(guard.clone())
    }

    async fn get_course(&self, id: &CourseId) -> Result<Option<Course>, StorageError> {
        let guard = self.courses.lock().map_err(lock_err)?;
        Ok(guard.iter().find(|course| &course.id == id).cloned())
    }

    async fn replace_catalog(
        &self,
        courses: &[Course],
        _now: DateTime<Utc>,
    ) -> Result<ReplaceSummary, StorageError> {
        let mut guard = self.courses.lock().map_err(lock_err)?;
        let incoming: HashSet<&CourseId> = courses.iter().map(|course| &course.id).collect();

        let before = guard.len();
        guard.retain(|course| incoming.contains(&course.id));
        let mut summary = ReplaceSummary {
            deleted: before - guard.len(),
            ..ReplaceSummary::default()
        };

        for course in courses {
            match guard.iter_mut().find(|existing| existing.id == course.id) {
                Some(existing) => {
                    *existing = course.clone();
                    summary.updated += 1;
                }
                None => {
                    guard.push(course.clone());
                    summary.created += 1;
                }
            }
        }
        Ok(summary)
    }
}

#[async_trait]
impl ProgressRepository for InMemoryRepository {
    async fn load_progress(&self, user_id: &UserId) -> Result<ProgressMap, StorageError> {
        let guard = self.progress.lock().map_err(lock_err)?;
        Ok(guard.get(user_id).cloned().unwrap_or_default())
    }

    async fn save_progress(&self, user_id: &UserId, map: &ProgressMap) -> Result<(), StorageError> {
        let mut guard = self.progress.lock().map_err(lock_err)?;
        guard.insert(user_id.clone(), map.clone());
        Ok(())
    }
}

#[async_trait]
impl CacheStore for InMemoryRepository {
    async fn read_slot(&self, key: &str) -> Result<Option<String>, StorageError> {
        let guard = self.slots.lock().map_err(lock_err)?;
        Ok(guard.get(key).cloned())
    }

    async fn write_slot(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut guard = self.slots.lock().map_err(lock_err)?;
        guard.insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    async fn clear_slot(&self, key: &str) -> Result<(), StorageError> {
        let mut guard = self.slots.lock().map_err(lock_err)?;
        guard.remove(key);
        Ok(())
    }
}

/// Aggregates repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub courses: Arc<dyn CourseRepository>,
    pub progress: Arc<dyn ProgressRepository>,
    pub cache: Arc<dyn CacheStore>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        let courses: Arc<dyn CourseRepository> = Arc::new(repo.clone());
        let progress: Arc<dyn ProgressRepository> = Arc::new(repo.clone());
        let cache: Arc<dyn CacheStore> = Arc::new(repo);
        Self {
            courses,
            progress,
            cache,
        }
    }
}
