//! Catalog sources the local cache can sync against.

use std::sync::Arc;

use async_trait::async_trait;
use lms_core::model::Course;
use reqwest::{Client, StatusCode};
use serde::Serialize;
use serde_json::Value;
use url::Url;

use crate::catalog_service::CatalogService;
use crate::error::{CatalogError, SyncError};
use crate::identity::IdentityProvider;
use crate::normalize::normalize_courses;

/// Read and write access to an authoritative catalog.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// Full catalog in creation order.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError` when the source cannot be read.
    async fn fetch(&self) -> Result<Vec<Course>, CatalogError>;

    /// Replace the source's catalog with `courses`.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError` when the caller lacks admin rights or the write fails.
    async fn publish(&self, courses: &[Course]) -> Result<(), CatalogError>;
}

/// In-process source backed by the local `CatalogService`.
#[derive(Clone)]
pub struct LocalCatalogSource {
    catalog: Arc<CatalogService>,
    identity: Arc<dyn IdentityProvider>,
}

impl LocalCatalogSource {
    #[must_use]
    pub fn new(catalog: Arc<CatalogService>, identity: Arc<dyn IdentityProvider>) -> Self {
        Self { catalog, identity }
    }
}

#[async_trait]
impl CatalogSource for LocalCatalogSource {
    async fn fetch(&self) -> Result<Vec<Course>, CatalogError> {
        self.catalog.fetch_catalog().await
    }

    async fn publish(&self, courses: &[Course]) -> Result<(), CatalogError> {
        let principal = self.identity.current();
        self.catalog
            .replace_catalog(principal.as_ref(), courses)
            .await?;
        Ok(())
    }
}

/// Remote catalog served at `{base}/api/courses`.
#[derive(Clone)]
pub struct HttpCatalogSource {
    client: Client,
    endpoint: Url,
    token: Option<String>,
}

#[derive(Serialize)]
struct PublishRequest<'a> {
    courses: &'a [Course],
}

impl HttpCatalogSource {
    /// # Errors
    ///
    /// Returns `url::ParseError` if `base_url` is not an absolute URL.
    pub fn new(base_url: &str, token: Option<String>) -> Result<Self, url::ParseError> {
        let endpoint = Url::parse(&format!(
            "{}/api/courses",
            base_url.trim().trim_end_matches('/')
        ))?;
        Ok(Self {
            client: Client::new(),
            endpoint,
            token: token.filter(|t| !t.trim().is_empty()),
        })
    }

    #[must_use]
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn read_body(response: reqwest::Response) -> Result<Value, SyncError> {
        let status = response.status();
        let text = response.text().await?;
        let body = serde_json::from_str::<Value>(&text);

        if !status.is_success() {
            let parsed = body.unwrap_or(Value::Null);
            return Err(rejection(status, &parsed));
        }
        body.map_err(|e| SyncError::Decode(e.to_string()))
    }
}

fn rejection(status: StatusCode, body: &Value) -> SyncError {
    let message = body
        .get("message")
        .and_then(Value::as_str)
        .map(str::to_owned)
        .unwrap_or_else(|| {
            match status {
                StatusCode::UNAUTHORIZED => "Unauthorized",
                StatusCode::FORBIDDEN => "Forbidden",
                _ => "Request failed",
            }
            .to_owned()
        });
    SyncError::Rejected { status, message }
}

#[async_trait]
impl CatalogSource for HttpCatalogSource {
    async fn fetch(&self) -> Result<Vec<Course>, CatalogError> {
        let response = self
            .authorize(self.client.get(self.endpoint.clone()))
            .send()
            .await
            .map_err(SyncError::from)?;
        let body = Self::read_body(response).await?;
        let courses = normalize_courses(body.get("courses").unwrap_or(&Value::Null));
        tracing::debug!(endpoint = %self.endpoint, count = courses.len(), "fetched remote catalog");
        Ok(courses)
    }

    async fn publish(&self, courses: &[Course]) -> Result<(), CatalogError> {
        let response = self
            .authorize(self.client.put(self.endpoint.clone()))
            .json(&PublishRequest { courses })
            .send()
            .await
            .map_err(SyncError::from)?;
        Self::read_body(response).await?;
        tracing::info!(endpoint = %self.endpoint, count = courses.len(), "published catalog");
        Ok(())
    }
}
