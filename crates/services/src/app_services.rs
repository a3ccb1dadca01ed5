use std::sync::Arc;

use chrono::Duration;
use lms_core::model::UserId;
use storage::repository::Storage;

use crate::Clock;
use crate::cache::CatalogCache;
use crate::catalog_service::CatalogService;
use crate::error::AppServicesError;
use crate::events::EventBus;
use crate::identity::{IdentityProvider, Principal};
use crate::progress_service::ProgressService;
use crate::sync::{CatalogSource, HttpCatalogSource, LocalCatalogSource};

/// Remote catalog endpoint the local cache syncs against instead of the local store.
#[derive(Debug, Clone)]
pub struct RemoteCatalog {
    pub base_url: String,
    pub token: Option<String>,
}

/// Knobs for assembling [`AppServices`].
#[derive(Clone)]
pub struct AppServicesConfig {
    pub clock: Clock,
    pub cache_max_age: Duration,
    pub remote: Option<RemoteCatalog>,
    pub identity: Arc<dyn IdentityProvider>,
}

/// Assembles app-facing services over one storage backend and one event bus.
#[derive(Clone)]
pub struct AppServices {
    events: EventBus,
    identity: Arc<dyn IdentityProvider>,
    catalog: Arc<CatalogService>,
    catalog_cache: Arc<CatalogCache>,
    progress: Arc<ProgressService>,
}

impl AppServices {
    /// Build services backed by `SQLite` storage.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization fails or the remote
    /// catalog URL is invalid.
    pub async fn new_sqlite(
        db_url: &str,
        config: AppServicesConfig,
    ) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        Self::from_storage(&storage, config).await
    }

    /// Build services over an existing storage aggregate.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError::RemoteUrl` if the remote catalog URL is invalid.
    pub async fn from_storage(
        storage: &Storage,
        config: AppServicesConfig,
    ) -> Result<Self, AppServicesError> {
        let events = EventBus::new();
        let catalog = Arc::new(CatalogService::new(
            config.clock,
            Arc::clone(&storage.courses),
        ));

        let source: Arc<dyn CatalogSource> = match &config.remote {
            Some(remote) => Arc::new(
                HttpCatalogSource::new(&remote.base_url, remote.token.clone())
                    .map_err(|e| AppServicesError::RemoteUrl(e.to_string()))?,
            ),
            None => Arc::new(LocalCatalogSource::new(
                Arc::clone(&catalog),
                Arc::clone(&config.identity),
            )),
        };

        let catalog_cache = Arc::new(
            CatalogCache::open(
                config.clock,
                config.cache_max_age,
                source,
                Arc::clone(&storage.cache),
                events.clone(),
            )
            .await,
        );
        let progress = Arc::new(ProgressService::new(
            Arc::clone(&storage.progress),
            Arc::clone(&catalog_cache),
            events.clone(),
        ));

        Ok(Self {
            events,
            identity: config.identity,
            catalog,
            catalog_cache,
            progress,
        })
    }

    #[must_use]
    pub fn events(&self) -> &EventBus {
        &self.events
    }

    #[must_use]
    pub fn principal(&self) -> Option<Principal> {
        self.identity.current()
    }

    /// User id of the current principal, if any.
    #[must_use]
    pub fn current_user_id(&self) -> Option<UserId> {
        self.identity.current().map(|p| p.user_id().clone())
    }

    #[must_use]
    pub fn catalog(&self) -> Arc<CatalogService> {
        Arc::clone(&self.catalog)
    }

    #[must_use]
    pub fn catalog_cache(&self) -> Arc<CatalogCache> {
        Arc::clone(&self.catalog_cache)
    }

    #[must_use]
    pub fn progress(&self) -> Arc<ProgressService> {
        Arc::clone(&self.progress)
    }
}
