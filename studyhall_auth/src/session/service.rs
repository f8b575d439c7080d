use std::sync::Arc;

use serde_json::json;
use tokio::sync::broadcast;

use crate::backend::{AuthChange, AuthOutcome, AuthUser, BackendClient, BackendError};
use crate::profile::NewProfile;

use super::errors::SessionError;
use super::types::{SignInData, SignUpData};

/// Auth operations over the backend client, one call each, with failure
/// classification into [`SessionError`]
#[derive(Clone)]
pub struct AuthService {
    backend: Arc<dyn BackendClient>,
}

impl AuthService {
    pub fn new(backend: Arc<dyn BackendClient>) -> Self {
        Self { backend }
    }

    /// Create an account and best-effort create the matching profile row
    ///
    /// Profile creation is expected to occasionally lose the race against a
    /// store-side trigger; any insert failure is logged and swallowed, the
    /// user can complete the profile later.
    pub async fn sign_up(&self, data: &SignUpData) -> Result<AuthOutcome, SessionError> {
        let metadata = json!({
            "first_name": data.first_name,
            "last_name": data.last_name,
            "grade": data.grade,
        });
        let outcome = self
            .backend
            .sign_up(&data.email, &data.password, metadata)
            .await?;

        if let Some(user) = &outcome.user {
            let row = NewProfile {
                id: user.id,
                first_name: data.first_name.clone(),
                last_name: data.last_name.clone(),
                grade: data.grade.clone(),
            };
            if let Err(e) = self.backend.insert_profile(&row).await {
                tracing::warn!("profile creation after sign-up failed, continuing: {e}");
            }
        }

        Ok(outcome)
    }

    pub async fn sign_in(&self, data: &SignInData) -> Result<AuthOutcome, SessionError> {
        let outcome = self
            .backend
            .sign_in_with_password(&data.email, &data.password)
            .await?;
        Ok(outcome)
    }

    pub async fn sign_out(&self) -> Result<(), SessionError> {
        self.backend.sign_out().await?;
        Ok(())
    }

    /// Resolve the current user; a missing session is `Ok(None)`, anything
    /// else propagates for the caller to distinguish
    pub(crate) async fn resolve_user(&self) -> Result<Option<AuthUser>, SessionError> {
        match self.backend.get_user().await {
            Ok(user) => Ok(user),
            Err(BackendError::SessionMissing) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Current user, or `None`; never fails, so callers are never blocked on
    /// an auth lookup
    pub async fn current_user(&self) -> Option<AuthUser> {
        match self.resolve_user().await {
            Ok(user) => user,
            Err(e) => {
                tracing::warn!("current-user lookup failed, treating as signed out: {e}");
                None
            }
        }
    }

    pub async fn reset_password(&self, email: &str) -> Result<(), SessionError> {
        self.backend.reset_password_for_email(email).await?;
        Ok(())
    }

    /// Push channel of auth-state changes
    pub fn subscribe(&self) -> broadcast::Receiver<AuthChange> {
        self.backend.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MockBackend;

    fn service() -> AuthService {
        AuthService::new(Arc::new(MockBackend::new()))
    }

    #[tokio::test]
    async fn test_sign_in_against_unconfigured_backend() {
        let data = SignInData {
            email: "student@example.com".to_string(),
            password: "secret".to_string(),
        };

        let err = service()
            .sign_in(&data)
            .await
            .expect_err("mock backend cannot sign in");
        assert_eq!(err, SessionError::NotConfigured);
    }

    #[tokio::test]
    async fn test_sign_up_against_unconfigured_backend() {
        let data = SignUpData {
            email: "student@example.com".to_string(),
            password: "secret".to_string(),
            first_name: "Asha".to_string(),
            last_name: "Iyer".to_string(),
            grade: "9".to_string(),
        };

        let err = service()
            .sign_up(&data)
            .await
            .expect_err("mock backend cannot sign up");
        assert_eq!(err, SessionError::NotConfigured);
    }

    /// The current-user lookup never raises; every failure path resolves to None
    #[tokio::test]
    async fn test_current_user_never_fails() {
        assert!(service().current_user().await.is_none());
    }

    #[tokio::test]
    async fn test_sign_out_and_reset_resolve() {
        let service = service();
        service.sign_out().await.expect("sign-out resolves");
        service
            .reset_password("student@example.com")
            .await
            .expect("reset resolves");
    }
}
