use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::profile::{NewProfile, ProfileChanges, UserProfile};

use super::client::BackendClient;
use super::errors::BackendError;
use super::types::{AuthChange, AuthEvent, AuthOutcome, AuthUser, Session};

/// Stand-in backend used when no real deployment is configured
///
/// Every call resolves: reads report an empty backend, writes report
/// [`BackendError::NotConfigured`]. Each subscriber receives a single
/// signed-out change shortly after subscribing, which settles the
/// coordinator into the unauthenticated state.
pub struct MockBackend {
    events: broadcast::Sender<AuthChange>,
}

impl MockBackend {
    pub fn new() -> Self {
        tracing::info!("creating mock backend client");
        let (events, _) = broadcast::channel(8);
        Self { events }
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BackendClient for MockBackend {
    async fn sign_up(
        &self,
        _email: &str,
        _password: &str,
        _metadata: Value,
    ) -> Result<AuthOutcome, BackendError> {
        Err(BackendError::NotConfigured)
    }

    async fn sign_in_with_password(
        &self,
        _email: &str,
        _password: &str,
    ) -> Result<AuthOutcome, BackendError> {
        Err(BackendError::NotConfigured)
    }

    async fn sign_out(&self) -> Result<(), BackendError> {
        Ok(())
    }

    async fn get_user(&self) -> Result<Option<AuthUser>, BackendError> {
        Ok(None)
    }

    async fn get_session(&self) -> Result<Option<Session>, BackendError> {
        Ok(None)
    }

    async fn reset_password_for_email(&self, _email: &str) -> Result<(), BackendError> {
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthChange> {
        let receiver = self.events.subscribe();
        let events = self.events.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            let _ = events.send(AuthChange {
                event: AuthEvent::SignedOut,
                session: None,
            });
        });
        receiver
    }

    async fn fetch_profile(&self, _id: Uuid) -> Result<UserProfile, BackendError> {
        Err(BackendError::NotFound)
    }

    async fn insert_profile(&self, _profile: &NewProfile) -> Result<UserProfile, BackendError> {
        Err(BackendError::NotConfigured)
    }

    async fn update_profile(
        &self,
        _id: Uuid,
        _changes: &ProfileChanges,
    ) -> Result<UserProfile, BackendError> {
        Err(BackendError::NotConfigured)
    }
}
