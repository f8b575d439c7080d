use thiserror::Error;

/// Closed set of failure kinds produced at the backend boundary
///
/// Raw backend responses (HTTP status codes, error bodies) are translated into
/// this enum inside the adapter; nothing upstream pattern-matches on free text.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// The backend endpoint or key is missing or a placeholder
    #[error("Backend not configured")]
    NotConfigured,

    /// A single-row lookup matched no rows
    #[error("No rows found")]
    NotFound,

    /// No session is available for a call that requires one
    #[error("Auth session missing")]
    SessionMissing,

    /// The access token was rejected as expired
    #[error("Authentication token expired")]
    TokenExpired,

    /// A request exceeded its deadline
    #[error("Request timeout")]
    Timeout,

    /// The backend could not be reached
    #[error("Unable to connect: {0}")]
    Network(String),

    /// Sign-up against an email that already has an account
    #[error("User already registered")]
    AlreadyRegistered,

    /// Password rejected by the backend's strength policy
    #[error("Password too short")]
    WeakPassword,

    /// Email address rejected as malformed
    #[error("Invalid email")]
    InvalidEmail,

    /// Wrong email/password combination
    #[error("Invalid login credentials")]
    InvalidCredentials,

    /// Account exists but the address was never confirmed
    #[error("Email not confirmed")]
    EmailNotConfirmed,

    /// Too many attempts in a short window
    #[error("Rate limited")]
    RateLimited,

    /// Invalid client construction input, e.g. a malformed endpoint URL
    #[error("Configuration error: {0}")]
    Config(String),

    /// A response body could not be decoded
    #[error("Decode error: {0}")]
    Serde(String),

    /// Unclassified backend failure, raw message passed through
    #[error("{0}")]
    Backend(String),
}

impl BackendError {
    /// Translate a transport-level failure into the closed taxonomy
    pub(crate) fn from_transport(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_connect() {
            Self::Network(err.to_string())
        } else {
            Self::Backend(err.to_string())
        }
    }
}

impl From<serde_json::Error> for BackendError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serde(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_is_sync_and_send() {
        fn assert_sync_send<T: Sync + Send>() {}
        assert_sync_send::<BackendError>();
    }

    #[test]
    fn test_error_display() {
        assert_eq!(BackendError::NotConfigured.to_string(), "Backend not configured");
        assert_eq!(BackendError::NotFound.to_string(), "No rows found");
        assert_eq!(BackendError::SessionMissing.to_string(), "Auth session missing");
        assert_eq!(BackendError::Timeout.to_string(), "Request timeout");
        assert_eq!(
            BackendError::Network("connection refused".to_string()).to_string(),
            "Unable to connect: connection refused"
        );
        assert_eq!(
            BackendError::Backend("raw message".to_string()).to_string(),
            "raw message"
        );
    }

    #[test]
    fn test_from_serde_json_error() {
        let json_error = serde_json::from_str::<serde_json::Value>("not json").unwrap_err();
        let err = BackendError::from(json_error);
        assert!(matches!(err, BackendError::Serde(_)));
    }
}
