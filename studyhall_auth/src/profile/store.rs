use std::sync::Arc;

use uuid::Uuid;

use crate::backend::{BackendClient, BackendError};
use crate::config::PROFILE_FETCH_TIMEOUT;

use super::errors::ProfileError;
use super::types::{NewProfile, ProfileChanges, UserProfile};

/// Profile-table operations over the backend client
///
/// Fetches are gated on an active session and bounded by a deadline; a
/// no-rows result is a valid "no profile yet" state, never an error.
#[derive(Clone)]
pub struct ProfileStore {
    backend: Arc<dyn BackendClient>,
}

impl ProfileStore {
    pub fn new(backend: Arc<dyn BackendClient>) -> Self {
        Self { backend }
    }

    /// Fetch the profile row for `user_id`, or `None` when none exists yet
    pub async fn get_profile(&self, user_id: Uuid) -> Result<Option<UserProfile>, ProfileError> {
        let session = self.backend.get_session().await?;
        if session.is_none() {
            tracing::debug!("profile fetch refused: no active session");
            return Err(ProfileError::SessionRequired);
        }

        tracing::debug!("fetching profile for user {user_id}");
        match tokio::time::timeout(PROFILE_FETCH_TIMEOUT, self.backend.fetch_profile(user_id)).await
        {
            Err(_) => Err(ProfileError::Timeout),
            Ok(Err(BackendError::NotFound)) => {
                tracing::debug!("no profile row for user {user_id}");
                Ok(None)
            }
            Ok(Err(e)) => Err(e.into()),
            Ok(Ok(profile)) => Ok(Some(profile)),
        }
    }

    pub async fn update_profile(
        &self,
        user_id: Uuid,
        changes: &ProfileChanges,
    ) -> Result<UserProfile, ProfileError> {
        let updated = self.backend.update_profile(user_id, changes).await?;
        Ok(updated)
    }

    pub async fn create_profile(&self, profile: &NewProfile) -> Result<UserProfile, ProfileError> {
        let created = self.backend.insert_profile(profile).await?;
        Ok(created)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MockBackend;

    #[tokio::test]
    async fn test_get_profile_requires_session() {
        // The mock backend reports no session, so the gate trips first
        let store = ProfileStore::new(Arc::new(MockBackend::new()));

        let err = store
            .get_profile(Uuid::new_v4())
            .await
            .expect_err("fetch without a session is refused");
        assert_eq!(err, ProfileError::SessionRequired);
    }

    #[tokio::test]
    async fn test_update_profile_without_configuration() {
        let store = ProfileStore::new(Arc::new(MockBackend::new()));

        let err = store
            .update_profile(Uuid::new_v4(), &ProfileChanges::default())
            .await
            .expect_err("mock writes are unavailable");
        assert_eq!(err, ProfileError::NotConfigured);
    }
}
