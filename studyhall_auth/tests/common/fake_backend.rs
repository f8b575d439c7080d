//! Scripted backend client for driving the coordinator through scenarios
//!
//! Unlike the crate's own mock (which models an unconfigured deployment),
//! this fixture is programmable: tests seed sessions and profile rows,
//! inject failures, stall individual calls, and emit push events by hand.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{Duration, Utc};
use serde_json::Value;
use tokio::sync::broadcast;
use uuid::Uuid;

use studyhall_auth::{
    AuthChange, AuthEvent, AuthOutcome, AuthUser, BackendClient, BackendError, NewProfile,
    ProfileChanges, Session, UserProfile,
};

pub fn seeded_user(id: Uuid) -> AuthUser {
    AuthUser {
        id,
        email: Some(format!("user-{id}@example.com")),
        user_metadata: Value::Null,
        created_at: Some(Utc::now()),
        last_sign_in_at: Some(Utc::now()),
    }
}

pub fn seeded_session(user: AuthUser) -> Session {
    Session {
        access_token: format!("access-{}", user.id),
        refresh_token: format!("refresh-{}", user.id),
        token_type: "bearer".to_string(),
        expires_at: Utc::now() + Duration::hours(1),
        user,
    }
}

pub fn seeded_profile(id: Uuid) -> UserProfile {
    UserProfile {
        id,
        first_name: "Asha".to_string(),
        last_name: "Iyer".to_string(),
        grade: "9".to_string(),
        board: None,
        area: None,
        profile_picture_url: None,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

#[derive(Default)]
pub struct FakeBackend {
    session: Mutex<Option<Session>>,
    profiles: Mutex<HashMap<Uuid, UserProfile>>,
    sign_in_failure: Mutex<Option<BackendError>>,
    sign_out_failure: Mutex<Option<BackendError>>,
    hang_user_lookup: AtomicBool,
    hang_profile_fetch: AtomicBool,
    profile_fetches: AtomicUsize,
    profile_updates: AtomicUsize,
    events: EventChannel,
}

/// Broadcast sender wrapper so `Default` works
pub struct EventChannel(broadcast::Sender<AuthChange>);

impl Default for EventChannel {
    fn default() -> Self {
        let (tx, _) = broadcast::channel(16);
        Self(tx)
    }
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Backend that already holds a valid session for `user_id`
    pub fn with_session(user_id: Uuid) -> Self {
        let fake = Self::new();
        fake.install_session(user_id);
        fake
    }

    /// Store a session and return it for use in push events
    pub fn install_session(&self, user_id: Uuid) -> Session {
        let session = seeded_session(seeded_user(user_id));
        *self.session.lock().unwrap() = Some(session.clone());
        session
    }

    pub fn clear_session(&self) {
        *self.session.lock().unwrap() = None;
    }

    pub fn current_session(&self) -> Option<Session> {
        self.session.lock().unwrap().clone()
    }

    pub fn put_profile(&self, profile: UserProfile) {
        self.profiles.lock().unwrap().insert(profile.id, profile);
    }

    pub fn fail_sign_in_with(&self, err: BackendError) {
        *self.sign_in_failure.lock().unwrap() = Some(err);
    }

    pub fn fail_sign_out_with(&self, err: BackendError) {
        *self.sign_out_failure.lock().unwrap() = Some(err);
    }

    /// Make `get_user` hang forever, as an unreachable backend would
    pub fn hang_user_lookup(&self) {
        self.hang_user_lookup.store(true, Ordering::SeqCst);
    }

    /// Make `fetch_profile` hang forever
    pub fn hang_profile_fetch(&self) {
        self.hang_profile_fetch.store(true, Ordering::SeqCst);
    }

    pub fn profile_fetch_count(&self) -> usize {
        self.profile_fetches.load(Ordering::SeqCst)
    }

    pub fn profile_update_count(&self) -> usize {
        self.profile_updates.load(Ordering::SeqCst)
    }

    /// Deliver a push event to every subscriber
    pub fn emit(&self, event: AuthEvent, session: Option<Session>) {
        self.events
            .0
            .send(AuthChange { event, session })
            .expect("coordinator is subscribed");
    }
}

#[async_trait]
impl BackendClient for FakeBackend {
    async fn sign_up(
        &self,
        _email: &str,
        _password: &str,
        _metadata: Value,
    ) -> Result<AuthOutcome, BackendError> {
        let session = self.install_session(Uuid::new_v4());
        Ok(AuthOutcome {
            user: Some(session.user.clone()),
            session: Some(session),
        })
    }

    async fn sign_in_with_password(
        &self,
        _email: &str,
        _password: &str,
    ) -> Result<AuthOutcome, BackendError> {
        if let Some(err) = self.sign_in_failure.lock().unwrap().clone() {
            return Err(err);
        }
        let session = self.install_session(Uuid::new_v4());
        Ok(AuthOutcome {
            user: Some(session.user.clone()),
            session: Some(session),
        })
    }

    async fn sign_out(&self) -> Result<(), BackendError> {
        if let Some(err) = self.sign_out_failure.lock().unwrap().clone() {
            return Err(err);
        }
        self.clear_session();
        Ok(())
    }

    async fn get_user(&self) -> Result<Option<AuthUser>, BackendError> {
        if self.hang_user_lookup.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        Ok(self
            .session
            .lock()
            .unwrap()
            .as_ref()
            .map(|s| s.user.clone()))
    }

    async fn get_session(&self) -> Result<Option<Session>, BackendError> {
        Ok(self.session.lock().unwrap().clone())
    }

    async fn reset_password_for_email(&self, _email: &str) -> Result<(), BackendError> {
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthChange> {
        self.events.0.subscribe()
    }

    async fn fetch_profile(&self, id: Uuid) -> Result<UserProfile, BackendError> {
        self.profile_fetches.fetch_add(1, Ordering::SeqCst);
        if self.hang_profile_fetch.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        self.profiles
            .lock()
            .unwrap()
            .get(&id)
            .cloned()
            .ok_or(BackendError::NotFound)
    }

    async fn insert_profile(&self, profile: &NewProfile) -> Result<UserProfile, BackendError> {
        let row = UserProfile {
            id: profile.id,
            first_name: profile.first_name.clone(),
            last_name: profile.last_name.clone(),
            grade: profile.grade.clone(),
            board: None,
            area: None,
            profile_picture_url: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        self.profiles.lock().unwrap().insert(row.id, row.clone());
        Ok(row)
    }

    async fn update_profile(
        &self,
        id: Uuid,
        changes: &ProfileChanges,
    ) -> Result<UserProfile, BackendError> {
        self.profile_updates.fetch_add(1, Ordering::SeqCst);
        let mut profiles = self.profiles.lock().unwrap();
        let row = profiles.get_mut(&id).ok_or(BackendError::NotFound)?;
        if let Some(first_name) = &changes.first_name {
            row.first_name = first_name.clone();
        }
        if let Some(last_name) = &changes.last_name {
            row.last_name = last_name.clone();
        }
        if let Some(grade) = &changes.grade {
            row.grade = grade.clone();
        }
        if let Some(board) = &changes.board {
            row.board = Some(board.clone());
        }
        if let Some(area) = &changes.area {
            row.area = Some(area.clone());
        }
        if let Some(url) = &changes.profile_picture_url {
            row.profile_picture_url = Some(url.clone());
        }
        row.updated_at = Utc::now();
        Ok(row.clone())
    }
}
