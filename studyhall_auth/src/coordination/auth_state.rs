use std::sync::Arc;

use tokio::sync::{broadcast, watch};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::backend::{AuthUser, BackendClient, Session};
use crate::config::BOOTSTRAP_TIMEOUT;
use crate::profile::{ProfileChanges, ProfileStore, UserProfile};
use crate::session::{AuthService, SignInData, SignUpData};

use super::errors::CoordinationError;

/// Message shown when session bootstrap fails for a reason other than a
/// plain timeout
const SERVICE_UNAVAILABLE: &str = "Authentication service unavailable - please try again later";

/// Read model published to consumers
///
/// Invariants: `profile` is `None` whenever `user` is `None`; `error` is
/// cleared at the start of every state-changing action; `loading` is true
/// only during bootstrap or while an explicit auth action is in flight.
#[derive(Debug, Clone, Default)]
pub struct AuthSnapshot {
    pub user: Option<AuthUser>,
    pub profile: Option<UserProfile>,
    pub session: Option<Session>,
    pub loading: bool,
    pub error: Option<String>,
}

impl AuthSnapshot {
    fn initial() -> Self {
        Self {
            loading: true,
            ..Self::default()
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }
}

/// Process-wide auth state, kept in sync with the backend
///
/// Construct once with [`AuthCoordinator::start`] and hand clones of the
/// [`watch::Receiver`] to consumers. The backend's push channel is the single
/// source of truth after bootstrap; every change event overwrites
/// `session`/`user` wholesale and schedules a background profile reload.
/// All spawned work is scoped to a cancellation token so nothing mutates
/// state after [`AuthCoordinator::shutdown`].
pub struct AuthCoordinator {
    service: AuthService,
    profiles: ProfileStore,
    state: watch::Sender<AuthSnapshot>,
    lifetime: CancellationToken,
}

impl AuthCoordinator {
    pub fn start(backend: Arc<dyn BackendClient>) -> Arc<Self> {
        let (state, _) = watch::channel(AuthSnapshot::initial());
        let coordinator = Arc::new(Self {
            service: AuthService::new(backend.clone()),
            profiles: ProfileStore::new(backend),
            state,
            lifetime: CancellationToken::new(),
        });
        coordinator.spawn_push_loop();
        coordinator.spawn_bootstrap();
        coordinator
    }

    /// Watch the read model; the current value is available immediately
    pub fn subscribe(&self) -> watch::Receiver<AuthSnapshot> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> AuthSnapshot {
        self.state.borrow().clone()
    }

    /// Cancel all background work; no state mutation happens afterwards
    pub fn shutdown(&self) {
        self.lifetime.cancel();
    }

    pub async fn sign_up(&self, data: &SignUpData) -> Result<(), CoordinationError> {
        self.state.send_modify(|s| {
            s.loading = true;
            s.error = None;
        });
        match self.service.sign_up(data).await {
            // loading stays set: the push event for the new session clears it
            Ok(_) => Ok(()),
            Err(e) => {
                let message = e.to_string();
                self.state.send_modify(|s| {
                    s.loading = false;
                    s.error = Some(message);
                });
                Err(e.into())
            }
        }
    }

    pub async fn sign_in(&self, data: &SignInData) -> Result<(), CoordinationError> {
        self.state.send_modify(|s| {
            s.loading = true;
            s.error = None;
        });
        match self.service.sign_in(data).await {
            // loading stays set: the push event for the new session clears it
            Ok(_) => Ok(()),
            Err(e) => {
                let message = e.to_string();
                self.state.send_modify(|s| {
                    s.loading = false;
                    s.error = Some(message);
                });
                Err(e.into())
            }
        }
    }

    pub async fn sign_out(&self) -> Result<(), CoordinationError> {
        self.state.send_modify(|s| {
            s.loading = true;
            s.error = None;
        });
        let result = self.service.sign_out().await;

        // Local state clears whether or not the backend call succeeded
        self.state.send_modify(|s| {
            s.user = None;
            s.profile = None;
            s.session = None;
            s.loading = false;
        });

        result.map_err(|e| {
            let message = e.to_string();
            self.state.send_modify(|s| s.error = Some(message));
            e.into()
        })
    }

    /// Update the signed-in user's profile and cache the returned row
    pub async fn update_profile(
        &self,
        changes: &ProfileChanges,
    ) -> Result<UserProfile, CoordinationError> {
        let Some(user_id) = self.state.borrow().user.as_ref().map(|u| u.id) else {
            return Err(CoordinationError::NoAuthenticatedUser);
        };

        self.state.send_modify(|s| s.error = None);
        match self.profiles.update_profile(user_id, changes).await {
            Ok(profile) => {
                self.state.send_modify(|s| {
                    if s.user.is_some() {
                        s.profile = Some(profile.clone());
                    }
                });
                Ok(profile)
            }
            Err(e) => {
                let message = e.to_string();
                self.state.send_modify(|s| s.error = Some(message));
                Err(e.into())
            }
        }
    }

    /// Repeat the profile-load step; no-op without a signed-in user
    pub async fn retry_profile_load(&self) {
        let Some(user_id) = self.state.borrow().user.as_ref().map(|u| u.id) else {
            return;
        };
        load_profile(&self.profiles, &self.state, user_id).await;
    }

    fn spawn_bootstrap(&self) {
        let service = self.service.clone();
        let profiles = self.profiles.clone();
        let state = self.state.clone();
        let scope = self.lifetime.child_token();

        tokio::spawn(async move {
            let resolved = tokio::select! {
                _ = scope.cancelled() => return,
                resolved = tokio::time::timeout(BOOTSTRAP_TIMEOUT, service.resolve_user()) => resolved,
            };

            match resolved {
                Ok(Ok(Some(user))) => {
                    tracing::debug!("initial session resolved for user {}", user.id);
                    let user_id = user.id;
                    state.send_modify(|s| s.user = Some(user));
                    spawn_profile_load(profiles, state.clone(), scope.child_token(), user_id);
                }
                Ok(Ok(None)) => {
                    tracing::debug!("no initial session");
                    settle_unauthenticated(&state, None);
                }
                Ok(Err(e)) => {
                    tracing::error!("session bootstrap failed: {e}");
                    settle_unauthenticated(&state, Some(SERVICE_UNAVAILABLE.to_string()));
                }
                Err(_) => {
                    // Timeout settles as unauthenticated with no error banner
                    tracing::warn!(
                        "session bootstrap exceeded {BOOTSTRAP_TIMEOUT:?}; continuing unauthenticated"
                    );
                    settle_unauthenticated(&state, None);
                }
            }

            state.send_modify(|s| s.loading = false);
        });
    }

    fn spawn_push_loop(&self) {
        let service = self.service.clone();
        let profiles = self.profiles.clone();
        let state = self.state.clone();
        let scope = self.lifetime.child_token();

        tokio::spawn(async move {
            let mut changes = service.subscribe();
            loop {
                let change = tokio::select! {
                    _ = scope.cancelled() => return,
                    received = changes.recv() => match received {
                        Ok(change) => change,
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            tracing::warn!("dropped {skipped} auth change events");
                            continue;
                        }
                        Err(broadcast::error::RecvError::Closed) => return,
                    },
                };

                tracing::debug!(
                    event = ?change.event,
                    has_session = change.session.is_some(),
                    "auth state change"
                );

                let user = change.session.as_ref().map(|s| s.user.clone());
                let user_id = user.as_ref().map(|u| u.id);
                let session = change.session;
                state.send_modify(|s| {
                    s.error = None;
                    s.user = user;
                    s.session = session;
                    if s.user.is_none() {
                        s.profile = None;
                    }
                    // Push updates never show a spinner
                    s.loading = false;
                });

                if let Some(user_id) = user_id {
                    spawn_profile_load(
                        profiles.clone(),
                        state.clone(),
                        scope.child_token(),
                        user_id,
                    );
                }
            }
        });
    }
}

impl Drop for AuthCoordinator {
    fn drop(&mut self) {
        self.lifetime.cancel();
    }
}

/// Clear the authenticated part of the snapshot unless a push event already
/// delivered fresher state
fn settle_unauthenticated(state: &watch::Sender<AuthSnapshot>, error: Option<String>) {
    state.send_modify(|s| {
        if s.session.is_none() {
            s.user = None;
            s.profile = None;
            if let Some(error) = error {
                s.error = Some(error);
            }
        }
    });
}

/// Background, fire-and-forget profile load scoped to the coordinator
fn spawn_profile_load(
    profiles: ProfileStore,
    state: watch::Sender<AuthSnapshot>,
    scope: CancellationToken,
    user_id: Uuid,
) {
    tokio::spawn(async move {
        tokio::select! {
            _ = scope.cancelled() => {}
            () = load_profile(&profiles, &state, user_id) => {}
        }
    });
}

/// The shared profile-load step used by bootstrap, push updates and retries
///
/// A missing row is a valid state; only classified failures reach the
/// snapshot's `error` field. Never propagates.
async fn load_profile(
    profiles: &ProfileStore,
    state: &watch::Sender<AuthSnapshot>,
    user_id: Uuid,
) {
    state.send_modify(|s| s.error = None);
    match profiles.get_profile(user_id).await {
        Ok(profile) => {
            state.send_modify(|s| {
                if s.user.is_some() {
                    s.profile = profile;
                }
            });
        }
        Err(e) => {
            tracing::warn!("profile load failed for user {user_id}: {e}");
            let message = e.to_string();
            state.send_modify(|s| {
                s.profile = None;
                s.error = Some(message);
            });
        }
    }
}
