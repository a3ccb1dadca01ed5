#![forbid(unsafe_code)]

pub mod app_services;
pub mod cache;
pub mod catalog_service;
pub mod error;
pub mod events;
pub mod identity;
pub mod lesson_view;
pub mod normalize;
pub mod progress_service;
pub mod sync;

pub use lms_core::Clock;

pub use app_services::{AppServices, AppServicesConfig, RemoteCatalog};
pub use cache::{COURSES_SLOT, Cache, CatalogCache};
pub use catalog_service::CatalogService;
pub use error::{AppServicesError, CatalogError, ProgressError, SyncError};
pub use events::{EventBus, LmsEvent};
pub use identity::{IdentityProvider, Principal, Role, StaticIdentity};
pub use lesson_view::{LessonContent, LessonView};
pub use normalize::{normalize_catalog_payload, normalize_courses};
pub use progress_service::{CourseSummary, ProgressService, QuizSubmission};
pub use sync::{CatalogSource, HttpCatalogSource, LocalCatalogSource};
