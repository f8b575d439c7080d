//! Profile service behavior against a scripted backend

mod common;

use std::sync::Arc;

use uuid::Uuid;

use common::fake_backend::{FakeBackend, seeded_profile};
use studyhall_auth::{
    AuthCoordinator, CoordinationError, ProfileChanges, ProfileError, ProfileStore,
};

/// A no-rows answer from the store resolves to None, not an error
#[tokio::test]
async fn missing_row_resolves_to_none() {
    let user_id = Uuid::new_v4();
    let backend = Arc::new(FakeBackend::with_session(user_id));
    let store = ProfileStore::new(backend.clone());

    let profile = store
        .get_profile(user_id)
        .await
        .expect("no-rows is a valid state");
    assert!(profile.is_none());

    // Once the row exists the same call returns it
    backend.put_profile(seeded_profile(user_id));
    let profile = store
        .get_profile(user_id)
        .await
        .expect("row loads")
        .expect("row present");
    assert_eq!(profile.id, user_id);
}

/// The session gate trips before any table query goes out
#[tokio::test]
async fn fetch_without_session_is_refused_before_contacting_the_table() {
    let backend = Arc::new(FakeBackend::new());
    let store = ProfileStore::new(backend.clone());

    let err = store
        .get_profile(Uuid::new_v4())
        .await
        .expect_err("no session means no fetch");
    assert_eq!(err, ProfileError::SessionRequired);
    assert_eq!(backend.profile_fetch_count(), 0);
}

/// Updates flow through to the store and return the fresh row
#[tokio::test]
async fn update_returns_fresh_row() {
    let user_id = Uuid::new_v4();
    let backend = Arc::new(FakeBackend::with_session(user_id));
    backend.put_profile(seeded_profile(user_id));
    let store = ProfileStore::new(backend.clone());

    let changes = ProfileChanges {
        area: Some("Pune".to_string()),
        ..ProfileChanges::default()
    };
    let updated = store
        .update_profile(user_id, &changes)
        .await
        .expect("update succeeds");
    assert_eq!(updated.area.as_deref(), Some("Pune"));
    assert_eq!(backend.profile_update_count(), 1);
}

/// The coordinator refuses a profile update with nobody signed in and never
/// contacts the backend
#[tokio::test]
async fn coordinator_update_without_user_skips_backend() {
    let backend = Arc::new(FakeBackend::new());
    let coordinator = AuthCoordinator::start(backend.clone());

    // Wait out the bootstrap so the refusal is not a loading artifact
    let mut rx = coordinator.subscribe();
    while rx.borrow().loading {
        rx.changed().await.expect("coordinator alive");
    }

    let err = coordinator
        .update_profile(&ProfileChanges {
            grade: Some("10".to_string()),
            ..ProfileChanges::default()
        })
        .await
        .expect_err("nobody is signed in");
    assert_eq!(err, CoordinationError::NoAuthenticatedUser);
    assert_eq!(backend.profile_update_count(), 0);
}
