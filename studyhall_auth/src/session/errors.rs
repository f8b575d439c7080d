use thiserror::Error;

use crate::backend::BackendError;

/// Auth operation failures with the wording shown to the user
///
/// The backend adapter produces the closed [`BackendError`] taxonomy; this
/// layer owns the translation of each kind into a short, human-readable
/// message. Unclassified backend failures pass their raw message through.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("An account with this email already exists. Please sign in instead.")]
    AlreadyRegistered,

    #[error("Password must be at least 6 characters long.")]
    WeakPassword,

    #[error("Please enter a valid email address.")]
    InvalidEmail,

    #[error("Invalid email or password. Please check your credentials and try again.")]
    InvalidCredentials,

    #[error("Please check your email and click the confirmation link before signing in.")]
    EmailNotConfirmed,

    #[error("Too many login attempts. Please wait a few minutes before trying again.")]
    RateLimited,

    #[error("The authentication backend is not configured.")]
    NotConfigured,

    #[error("Connection timeout - please check your internet connection.")]
    Timeout,

    #[error("Unable to connect to the authentication service.")]
    Network,

    #[error("No active session. Please sign in.")]
    SessionMissing,

    #[error("Authentication token expired. Please sign in again.")]
    TokenExpired,

    #[error("{0}")]
    Backend(String),
}

impl From<BackendError> for SessionError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::AlreadyRegistered => Self::AlreadyRegistered,
            BackendError::WeakPassword => Self::WeakPassword,
            BackendError::InvalidEmail => Self::InvalidEmail,
            BackendError::InvalidCredentials => Self::InvalidCredentials,
            BackendError::EmailNotConfirmed => Self::EmailNotConfirmed,
            BackendError::RateLimited => Self::RateLimited,
            BackendError::NotConfigured => Self::NotConfigured,
            BackendError::Timeout => Self::Timeout,
            BackendError::Network(_) => Self::Network,
            BackendError::SessionMissing => Self::SessionMissing,
            BackendError::TokenExpired => Self::TokenExpired,
            other => Self::Backend(other.to_string()),
        }
    }
}
