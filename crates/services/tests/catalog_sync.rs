use std::sync::Arc;

use chrono::Duration;
use lms_core::authoring::new_course;
use lms_core::model::{Course, UserId};
use lms_core::time::fixed_now;
use services::{
    AppServices, AppServicesConfig, CatalogError, Clock, LmsEvent, Principal, Role,
    StaticIdentity,
};
use storage::repository::Storage;

fn config(principal: Option<Principal>) -> AppServicesConfig {
    AppServicesConfig {
        clock: Clock::fixed(fixed_now()),
        cache_max_age: Duration::minutes(5),
        remote: None,
        identity: Arc::new(StaticIdentity::new(principal)),
    }
}

fn titled(titles: &[&str]) -> Vec<Course> {
    let clock = Clock::fixed(fixed_now());
    let mut courses: Vec<Course> = Vec::new();
    for title in titles {
        let course = new_course(title, &courses, &clock);
        courses.push(course);
    }
    courses
}

async fn storage(db: &str) -> Storage {
    Storage::sqlite(&format!("sqlite:file:{db}?mode=memory&cache=shared"))
        .await
        .expect("connect sqlite")
}

#[tokio::test]
async fn admin_save_reconciles_and_updates_cache() {
    let storage = storage("memdb_catalog_sync").await;
    let admin = Principal::new(UserId::new("admin"), Role::Admin);
    let app = AppServices::from_storage(&storage, config(Some(admin)))
        .await
        .unwrap();
    let cache = app.catalog_cache();

    let mut events = app.events().subscribe();

    let initial = titled(&["Alpha", "Beta", "Gamma"]);
    cache.save_remote(initial.clone()).await.unwrap();

    let mut edited = vec![initial[0].clone(), initial[2].clone()];
    edited[0].title = "Alpha v2".into();
    cache.save_remote(edited).await.unwrap();

    let authoritative = app.catalog().fetch_catalog().await.unwrap();
    let ids: Vec<&str> = authoritative.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ids, ["alpha", "gamma"]);
    assert_eq!(authoritative[0].title, "Alpha v2");

    let cached = cache.refresh().await.unwrap();
    assert_eq!(cached, authoritative);
    let mut updates = 0;
    while let Ok(event) = events.try_recv() {
        assert_eq!(event, LmsEvent::CoursesUpdated);
        updates += 1;
    }
    assert_eq!(updates, 3);
    assert!(!cache.is_stale().await);
}

#[tokio::test]
async fn learner_cannot_publish_and_cache_stays_put() {
    let storage = storage("memdb_catalog_forbidden").await;
    let learner = Principal::new(UserId::new("u"), Role::User);
    let app = AppServices::from_storage(&storage, config(Some(learner)))
        .await
        .unwrap();

    let err = app
        .catalog_cache()
        .save_remote(titled(&["Sneaky"]))
        .await
        .unwrap_err();
    assert!(matches!(err, CatalogError::Forbidden));
    assert!(app.catalog_cache().courses().await.is_empty());
    assert!(app.catalog().fetch_catalog().await.unwrap().is_empty());

    let anonymous = AppServices::from_storage(&storage, config(None))
        .await
        .unwrap();
    let err = anonymous
        .catalog_cache()
        .save_remote(Vec::new())
        .await
        .unwrap_err();
    assert!(matches!(err, CatalogError::Unauthorized));
}

#[tokio::test]
async fn cached_catalog_survives_restart_until_invalidated() {
    let storage = storage("memdb_catalog_restart").await;
    let admin = Principal::new(UserId::new("admin"), Role::Admin);
    let app = AppServices::from_storage(&storage, config(Some(admin.clone())))
        .await
        .unwrap();
    app.catalog()
        .replace_catalog(Some(&admin), &titled(&["Alpha"]))
        .await
        .unwrap();

    // A never-synced cache is stale and empty; views do not hit the store.
    let cache = app.catalog_cache();
    assert!(cache.is_stale().await);
    assert!(cache.courses().await.is_empty());
    cache.refresh_if_stale().await.unwrap();

    let reopened = AppServices::from_storage(&storage, config(Some(admin)))
        .await
        .unwrap();
    let cache = reopened.catalog_cache();
    assert_eq!(cache.courses().await.len(), 1);
    assert_eq!(cache.last_synced_at().await, Some(fixed_now()));
    assert!(!cache.is_stale().await);
    assert!(cache.is_stale_at(fixed_now() + Duration::minutes(6)).await);

    cache.invalidate().await;
    assert!(cache.is_stale().await);
    assert_eq!(cache.courses().await.len(), 1);
}
