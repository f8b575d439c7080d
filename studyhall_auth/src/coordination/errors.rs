use thiserror::Error;

use crate::profile::ProfileError;
use crate::session::SessionError;

/// Errors surfaced by coordinator actions
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoordinationError {
    /// An action that requires an authenticated user ran without one
    #[error("No user is signed in")]
    NoAuthenticatedUser,

    /// Error from the session service
    #[error("{0}")]
    Session(SessionError),

    /// Error from the profile service
    #[error("{0}")]
    Profile(ProfileError),
}

// From implementations log at the conversion point so action call sites stay
// free of logging boilerplate

impl From<SessionError> for CoordinationError {
    fn from(err: SessionError) -> Self {
        let error = Self::Session(err);
        tracing::warn!("{}", error);
        error
    }
}

impl From<ProfileError> for CoordinationError {
    fn from(err: ProfileError) -> Self {
        let error = Self::Profile(err);
        tracing::warn!("{}", error);
        error
    }
}
