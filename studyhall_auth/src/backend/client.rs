use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::config::BackendConfig;
use crate::profile::{NewProfile, ProfileChanges, UserProfile};

use super::errors::BackendError;
use super::mock::MockBackend;
use super::rest::RestBackend;
use super::types::{AuthChange, AuthOutcome, AuthUser, Session};

/// Capability set offered by the authentication-and-database backend
///
/// Two concrete implementations exist: the REST client talks to a real
/// deployment, [`MockBackend`] stands in when configuration is absent. The
/// implementation is selected once by [`connect`] and never branched on later.
#[async_trait]
pub trait BackendClient: Send + Sync {
    /// Create an account; `metadata` is attached to the identity record
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: Value,
    ) -> Result<AuthOutcome, BackendError>;

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthOutcome, BackendError>;

    async fn sign_out(&self) -> Result<(), BackendError>;

    /// Fetch the identity record for the current session
    async fn get_user(&self) -> Result<Option<AuthUser>, BackendError>;

    /// Current session, refreshed first when close to expiry
    async fn get_session(&self) -> Result<Option<Session>, BackendError>;

    async fn reset_password_for_email(&self, email: &str) -> Result<(), BackendError>;

    /// Standing channel of auth-state changes; unsubscribe by dropping the receiver
    fn subscribe(&self) -> broadcast::Receiver<AuthChange>;

    /// Single-row profile lookup; absence surfaces as [`BackendError::NotFound`]
    async fn fetch_profile(&self, id: Uuid) -> Result<UserProfile, BackendError>;

    async fn insert_profile(&self, profile: &NewProfile) -> Result<UserProfile, BackendError>;

    async fn update_profile(
        &self,
        id: Uuid,
        changes: &ProfileChanges,
    ) -> Result<UserProfile, BackendError>;
}

/// Select and construct the backend client from the environment
///
/// Missing or placeholder configuration yields the mock client so the
/// application can start without a real backend; a present but malformed
/// endpoint URL fails fast instead.
pub async fn connect() -> Result<Arc<dyn BackendClient>, BackendError> {
    connect_with(BackendConfig::from_env()).await
}

/// [`connect`] with explicit configuration
pub async fn connect_with(config: BackendConfig) -> Result<Arc<dyn BackendClient>, BackendError> {
    if !config.is_configured() {
        tracing::warn!(
            "backend endpoint or key missing or placeholder; using mock backend, auth calls will report not-configured"
        );
        return Ok(Arc::new(MockBackend::new()));
    }

    let backend = Arc::new(RestBackend::new(config)?);
    backend.spawn_probe();
    Ok(backend)
}
