//! studyhall_auth - client-side authentication session lifecycle for the
//! Studyhall education app
//!
//! This crate wires a third-party authentication-and-database backend into a
//! process-wide reactive auth store: a backend client adapter (real or mock,
//! selected by configuration), a session/profile service that classifies
//! failures into user-facing messages, and a coordinator that keeps
//! `{user, profile, session, loading, error}` in sync via the backend's push
//! channel.

mod backend;
mod config;
mod coordination;
mod profile;
mod session;

pub use backend::{
    AuthChange, AuthEvent, AuthOutcome, AuthUser, BackendClient, BackendError, MockBackend,
    Session, connect, connect_with,
};
pub use config::{BackendConfig, PROFILES_TABLE, RESET_REDIRECT_URL};
pub use coordination::{AuthCoordinator, AuthSnapshot, CoordinationError};
pub use profile::{NewProfile, ProfileChanges, ProfileError, ProfileStore, UserProfile};
pub use session::{AuthService, SessionError, SignInData, SignUpData};

/// Select and construct the backend client from the environment
///
/// Convenience alias for [`connect`]; pair with [`AuthCoordinator::start`]:
///
/// ```no_run
/// # async fn run() -> Result<(), studyhall_auth::BackendError> {
/// let backend = studyhall_auth::init().await?;
/// let auth = studyhall_auth::AuthCoordinator::start(backend);
/// let state = auth.subscribe();
/// # Ok(())
/// # }
/// ```
pub async fn init() -> Result<std::sync::Arc<dyn BackendClient>, BackendError> {
    backend::connect().await
}
