//! Local-first catalog cache.
//!
//! Views read the cached catalog only. The cache is filled by an explicit
//! [`CatalogCache::refresh`], persisted into a key-value slot so the next start
//! is instant, and carries the time it was last synced so callers can decide
//! when it is stale.

use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use lms_core::model::{Course, CourseId};
use serde::{Deserialize, Serialize};
use storage::repository::CacheStore;
use tokio::sync::RwLock;

use crate::Clock;
use crate::error::CatalogError;
use crate::events::{EventBus, LmsEvent};
use crate::sync::CatalogSource;

/// Storage slot holding the serialized catalog cache.
pub const COURSES_SLOT: &str = "courses";

/// A value together with the time it was last pulled from its source.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cache<T> {
    value: T,
    #[serde(default)]
    last_synced_at: Option<DateTime<Utc>>,
}

impl<T> Cache<T> {
    /// A cache that has never been synced.
    #[must_use]
    pub fn new(value: T) -> Self {
        Self {
            value,
            last_synced_at: None,
        }
    }

    #[must_use]
    pub fn value(&self) -> &T {
        &self.value
    }

    #[must_use]
    pub fn last_synced_at(&self) -> Option<DateTime<Utc>> {
        self.last_synced_at
    }

    /// Stale when never synced, invalidated, or older than `max_age` at `now`.
    #[must_use]
    pub fn is_stale(&self, now: DateTime<Utc>, max_age: Duration) -> bool {
        match self.last_synced_at {
            None => true,
            Some(at) => now - at > max_age,
        }
    }

    /// Forces the next staleness check to report stale. The value is kept.
    pub fn invalidate(&mut self) {
        self.last_synced_at = None;
    }

    /// Pulls a fresh value with `fetch`. On failure the cached value is untouched.
    ///
    /// # Errors
    ///
    /// Propagates the error returned by `fetch`.
    pub async fn refresh<F, Fut, E>(&mut self, now: DateTime<Utc>, fetch: F) -> Result<&T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let value = fetch().await?;
        self.record(value, now);
        Ok(&self.value)
    }

    /// Stores a value known to match the source, such as one just written to it.
    pub fn record(&mut self, value: T, now: DateTime<Utc>) {
        self.value = value;
        self.last_synced_at = Some(now);
    }
}

/// The catalog cache used by every view.
pub struct CatalogCache {
    clock: Clock,
    max_age: Duration,
    source: Arc<dyn CatalogSource>,
    slots: Arc<dyn CacheStore>,
    events: EventBus,
    state: RwLock<Cache<Vec<Course>>>,
}

impl CatalogCache {
    /// Opens the cache, restoring the last persisted copy if there is a readable one.
    pub async fn open(
        clock: Clock,
        max_age: Duration,
        source: Arc<dyn CatalogSource>,
        slots: Arc<dyn CacheStore>,
        events: EventBus,
    ) -> Self {
        let restored = match slots.read_slot(COURSES_SLOT).await {
            Ok(Some(raw)) => serde_json::from_str::<Cache<Vec<Course>>>(&raw).unwrap_or_else(|err| {
                tracing::warn!(error = %err, "discarding unreadable catalog cache");
                Cache::default()
            }),
            Ok(None) => Cache::default(),
            Err(err) => {
                tracing::warn!(error = %err, "catalog cache slot unavailable");
                Cache::default()
            }
        };
        tracing::debug!(
            courses = restored.value().len(),
            last_synced_at = ?restored.last_synced_at(),
            "restored catalog cache"
        );

        Self {
            clock,
            max_age,
            source,
            slots,
            events,
            state: RwLock::new(restored),
        }
    }

    /// Cached courses. Never touches the source.
    pub async fn courses(&self) -> Vec<Course> {
        self.state.read().await.value().clone()
    }

    pub async fn course(&self, id: &CourseId) -> Option<Course> {
        self.state
            .read()
            .await
            .value()
            .iter()
            .find(|course| &course.id == id)
            .cloned()
    }

    pub async fn last_synced_at(&self) -> Option<DateTime<Utc>> {
        self.state.read().await.last_synced_at()
    }

    pub async fn is_stale(&self) -> bool {
        self.is_stale_at(self.clock.now()).await
    }

    pub async fn is_stale_at(&self, now: DateTime<Utc>) -> bool {
        self.state.read().await.is_stale(now, self.max_age)
    }

    /// Pulls the catalog from the source, stores it locally and announces the change.
    ///
    /// Readers keep seeing the previous copy while the fetch is in flight; the
    /// write lock is only taken to swap the new value in.
    ///
    /// # Errors
    ///
    /// Returns the source's `CatalogError`; the cached copy is left untouched.
    pub async fn refresh(&self) -> Result<Vec<Course>, CatalogError> {
        let courses = self.source.fetch().await?;
        self.state
            .write()
            .await
            .record(courses.clone(), self.clock.now());
        self.persist().await;
        self.events.publish(LmsEvent::CoursesUpdated);
        tracing::info!(count = courses.len(), "catalog refreshed");
        Ok(courses)
    }

    /// Refreshes only when the cache is stale. Returns the courses either way.
    ///
    /// # Errors
    ///
    /// Same as [`CatalogCache::refresh`].
    pub async fn refresh_if_stale(&self) -> Result<Vec<Course>, CatalogError> {
        if self.is_stale().await {
            self.refresh().await
        } else {
            Ok(self.courses().await)
        }
    }

    /// Publishes `courses` to the source, then mirrors them into the cache.
    ///
    /// # Errors
    ///
    /// Returns the source's `CatalogError`; the cache is left untouched.
    pub async fn save_remote(&self, courses: Vec<Course>) -> Result<(), CatalogError> {
        self.source.publish(&courses).await?;
        self.state.write().await.record(courses, self.clock.now());
        self.persist().await;
        self.events.publish(LmsEvent::CoursesUpdated);
        Ok(())
    }

    /// Marks the cache stale so the next `refresh_if_stale` pulls from the source.
    pub async fn invalidate(&self) {
        self.state.write().await.invalidate();
        self.persist().await;
    }

    async fn persist(&self) {
        let encoded = {
            let state = self.state.read().await;
            serde_json::to_string(&*state)
        };
        let result = match encoded {
            Ok(raw) => self.slots.write_slot(COURSES_SLOT, &raw).await,
            Err(err) => {
                tracing::warn!(error = %err, "catalog cache could not be encoded");
                return;
            }
        };
        if let Err(err) = result {
            tracing::warn!(error = %err, "catalog cache could not be persisted");
        }
    }
}
