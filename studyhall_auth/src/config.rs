//! Central configuration for the studyhall_auth crate

use std::env;
use std::path::PathBuf;
use std::sync::LazyLock;
use std::time::Duration;

/// Profiles table name exposed by the backend's table API
///
/// Default: "user_profiles"
pub static PROFILES_TABLE: LazyLock<String> = LazyLock::new(|| {
    env::var("STUDYHALL_PROFILES_TABLE").unwrap_or_else(|_| "user_profiles".to_string())
});

/// Redirect target appended to password-reset emails, if any
pub static RESET_REDIRECT_URL: LazyLock<Option<String>> = LazyLock::new(|| {
    env::var("STUDYHALL_RESET_REDIRECT_URL")
        .ok()
        .filter(|v| !v.trim().is_empty())
});

/// Deadline applied to every backend network call
pub(crate) const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Deadline for the best-effort connectivity probe run at construction
pub(crate) const PROBE_TIMEOUT: Duration = Duration::from_secs(3);

/// Deadline for resolving the current user during session bootstrap
pub(crate) const BOOTSTRAP_TIMEOUT: Duration = Duration::from_secs(5);

/// Deadline for a single profile fetch
pub(crate) const PROFILE_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// How long before expiry a session token is refreshed
pub(crate) const REFRESH_MARGIN: Duration = Duration::from_secs(60);

/// Marker substrings left behind by scaffolding that was never configured
const PLACEHOLDER_MARKERS: [&str; 2] = ["your-project-id", "your-anon-key"];

/// Backend connection settings read from the environment
///
/// Missing or placeholder values do not fail construction; they select the
/// mock backend instead so the application can still start.
#[derive(Debug, Clone)]
pub struct BackendConfig {
    /// Backend project endpoint, e.g. `https://abc.example.co`
    pub url: Option<String>,
    /// Public (publishable) API key sent with every request
    pub publishable_key: Option<String>,
    /// Optional path for the on-disk session cache
    pub session_file: Option<PathBuf>,
}

impl BackendConfig {
    /// Read `STUDYHALL_BACKEND_URL`, `STUDYHALL_BACKEND_ANON_KEY` and
    /// `STUDYHALL_SESSION_FILE` from the environment.
    pub fn from_env() -> Self {
        Self {
            url: env::var("STUDYHALL_BACKEND_URL")
                .ok()
                .filter(|v| !v.trim().is_empty()),
            publishable_key: env::var("STUDYHALL_BACKEND_ANON_KEY")
                .ok()
                .filter(|v| !v.trim().is_empty()),
            session_file: env::var("STUDYHALL_SESSION_FILE")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from),
        }
    }

    /// Whether both connection values are present and free of placeholders
    pub fn is_configured(&self) -> bool {
        match (&self.url, &self.publishable_key) {
            (Some(url), Some(key)) => !is_placeholder(url) && !is_placeholder(key),
            _ => false,
        }
    }
}

fn is_placeholder(value: &str) -> bool {
    PLACEHOLDER_MARKERS
        .iter()
        .any(|marker| value.contains(marker))
}
