use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Identity record issued by the backend's auth service
///
/// Exists only while a session exists; the application-level profile row is a
/// separate record keyed by this id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: Option<String>,
    /// Free-form attributes attached at sign-up (first name, grade, ...)
    #[serde(default)]
    pub user_metadata: Value,
    pub created_at: Option<DateTime<Utc>>,
    pub last_sign_in_at: Option<DateTime<Utc>>,
}

/// Credential bundle proving an authenticated identity
///
/// Owned by the backend; mirrored read-only here. Replaced wholesale on every
/// auth-state change, cleared on sign-out.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_at: DateTime<Utc>,
    pub user: AuthUser,
}

impl Session {
    /// Whether the access token expires within `margin` from now
    pub fn expires_within(&self, margin: Duration) -> bool {
        self.expires_at - margin <= Utc::now()
    }
}

/// Kind of auth-state change pushed by the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuthEvent {
    SignedIn,
    SignedOut,
    TokenRefreshed,
}

/// One auth-state change delivered over the push channel
#[derive(Debug, Clone)]
pub struct AuthChange {
    pub event: AuthEvent,
    pub session: Option<Session>,
}

/// Result of a sign-up or sign-in call
///
/// Sign-in always carries both fields; sign-up carries no session when the
/// deployment requires email confirmation first.
#[derive(Debug, Clone)]
pub struct AuthOutcome {
    pub user: Option<AuthUser>,
    pub session: Option<Session>,
}

/// Token grant payload returned by the auth endpoints
#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    pub(crate) access_token: String,
    pub(crate) refresh_token: String,
    pub(crate) token_type: String,
    pub(crate) expires_in: i64,
    pub(crate) expires_at: Option<i64>,
    pub(crate) user: AuthUser,
}

impl TokenResponse {
    pub(crate) fn into_session(self) -> Session {
        let expires_at = self
            .expires_at
            .and_then(|ts| DateTime::<Utc>::from_timestamp(ts, 0))
            .unwrap_or_else(|| Utc::now() + Duration::seconds(self.expires_in));
        Session {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            token_type: self.token_type,
            expires_at,
            user: self.user,
        }
    }
}

/// Error body shape shared by the auth and table APIs
///
/// The auth API reports `error_code`/`msg`, the table API `code`/`message`,
/// older deployments `error`/`error_description`. All fields are optional so
/// any of the shapes decodes.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub(crate) code: Option<Value>,
    #[serde(default)]
    pub(crate) error_code: Option<String>,
    #[serde(default)]
    pub(crate) msg: Option<String>,
    #[serde(default)]
    pub(crate) message: Option<String>,
    #[serde(default)]
    pub(crate) error: Option<String>,
    #[serde(default)]
    pub(crate) error_description: Option<String>,
}

impl ErrorBody {
    pub(crate) fn from_text(text: &str) -> Self {
        serde_json::from_str(text).unwrap_or_default()
    }

    /// Best available human-readable message, falling back to the raw text
    pub(crate) fn message_or<'a>(&'a self, fallback: &'a str) -> &'a str {
        self.msg
            .as_deref()
            .or(self.message.as_deref())
            .or(self.error_description.as_deref())
            .or(self.error.as_deref())
            .unwrap_or(fallback)
    }

    /// Table API error code such as "PGRST116", if present
    pub(crate) fn table_code(&self) -> Option<&str> {
        match &self.code {
            Some(Value::String(code)) => Some(code.as_str()),
            _ => None,
        }
    }
}
