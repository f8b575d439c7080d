use thiserror::Error;

use crate::backend::BackendError;

/// Profile operation failures, with user-facing wording
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProfileError {
    #[error("No active session. Please sign in.")]
    SessionRequired,

    #[error("Authentication token expired. Please sign in again.")]
    TokenExpired,

    #[error("Request timed out. Please check your internet connection and try again.")]
    Timeout,

    #[error("Unable to connect to the database. Please check your internet connection and try again.")]
    Connection,

    #[error("Profile storage is not configured.")]
    NotConfigured,

    #[error("Database error: {0}")]
    Database(String),
}

impl From<BackendError> for ProfileError {
    fn from(err: BackendError) -> Self {
        let mapped = match err {
            BackendError::SessionMissing => Self::SessionRequired,
            BackendError::TokenExpired => Self::TokenExpired,
            BackendError::Timeout => Self::Timeout,
            BackendError::Network(_) => Self::Connection,
            BackendError::NotConfigured => Self::NotConfigured,
            other => Self::Database(other.to_string()),
        };
        tracing::debug!("profile backend failure classified as {mapped:?}");
        mapped
    }
}
