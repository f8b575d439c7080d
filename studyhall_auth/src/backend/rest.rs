use std::path::Path;
use std::sync::{Arc, Mutex as StdMutex};

use async_trait::async_trait;
use chrono::{Duration, Utc};
use reqwest::{Client, Response, StatusCode, header};
use serde_json::{Value, json};
use tokio::sync::{RwLock, broadcast};
use tokio::task::JoinHandle;
use url::Url;
use uuid::Uuid;

use crate::config::{
    BackendConfig, PROBE_TIMEOUT, PROFILES_TABLE, REFRESH_MARGIN, REQUEST_TIMEOUT,
    RESET_REDIRECT_URL,
};
use crate::profile::{NewProfile, ProfileChanges, UserProfile};

use super::client::BackendClient;
use super::errors::BackendError;
use super::types::{AuthChange, AuthEvent, AuthOutcome, AuthUser, ErrorBody, Session, TokenResponse};

const SINGLE_OBJECT: &str = "application/vnd.pgrst.object+json";

struct Inner {
    http: Client,
    base: String,
    key: String,
    session: RwLock<Option<Session>>,
    events: broadcast::Sender<AuthChange>,
    session_file: Option<std::path::PathBuf>,
    refresh_task: StdMutex<Option<JoinHandle<()>>>,
}

impl Inner {
    fn auth_endpoint(&self, path: &str) -> String {
        format!("{}/auth/v1/{}", self.base, path)
    }

    fn table_endpoint(&self) -> String {
        format!("{}/rest/v1/{}", self.base, &**PROFILES_TABLE)
    }
}

/// Backend client backed by a real deployment's auth and table HTTP APIs
pub(crate) struct RestBackend {
    inner: Arc<Inner>,
}

impl RestBackend {
    pub(crate) fn new(config: BackendConfig) -> Result<Self, BackendError> {
        let raw_url = config
            .url
            .ok_or_else(|| BackendError::Config("backend URL missing".to_string()))?;
        let key = config
            .publishable_key
            .ok_or_else(|| BackendError::Config("backend key missing".to_string()))?;

        let url = Url::parse(&raw_url).map_err(|e| {
            BackendError::Config(format!("invalid backend URL format: {raw_url}: {e}"))
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(BackendError::Config(format!(
                "backend URL must be http(s): {raw_url}"
            )));
        }

        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| BackendError::Config(e.to_string()))?;

        let cached = config
            .session_file
            .as_deref()
            .and_then(load_cached_session);
        let has_cached = cached.is_some();

        let (events, _) = broadcast::channel(16);
        let inner = Arc::new(Inner {
            http,
            base: raw_url.trim_end_matches('/').to_string(),
            key,
            session: RwLock::new(cached),
            events,
            session_file: config.session_file,
            refresh_task: StdMutex::new(None),
        });

        if has_cached {
            tracing::debug!("restored session from cache file");
            schedule_refresh(&inner);
        }

        Ok(Self { inner })
    }

    /// Best-effort connectivity check, logged and forgotten
    pub(crate) fn spawn_probe(&self) {
        let inner = self.inner.clone();
        tokio::spawn(async move {
            match tokio::time::timeout(PROBE_TIMEOUT, probe(&inner)).await {
                Ok(Ok(())) => tracing::info!("backend connectivity probe succeeded"),
                Ok(Err(e)) if e.to_string().contains("does not exist") => {
                    tracing::warn!(
                        "backend reachable but the {} table was not found; run the migration",
                        &**PROFILES_TABLE
                    );
                }
                Ok(Err(e)) => tracing::warn!("backend connectivity probe failed: {e}"),
                Err(_) => tracing::warn!("backend connectivity probe timed out"),
            }
        });
    }

    async fn bearer_token(&self) -> String {
        let session = self.inner.session.read().await;
        session
            .as_ref()
            .map(|s| s.access_token.clone())
            .unwrap_or_else(|| self.inner.key.clone())
    }

    async fn store_session(&self, session: Option<Session>) {
        persist_session(self.inner.session_file.as_deref(), session.as_ref());
        *self.inner.session.write().await = session.clone();
        match session {
            Some(_) => schedule_refresh(&self.inner),
            None => set_refresh_task(&self.inner, None),
        }
    }

    async fn adopt_session(&self, session: Session) -> Session {
        self.store_session(Some(session.clone())).await;
        let _ = self.inner.events.send(AuthChange {
            event: AuthEvent::SignedIn,
            session: Some(session.clone()),
        });
        session
    }
}

#[async_trait]
impl BackendClient for RestBackend {
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: Value,
    ) -> Result<AuthOutcome, BackendError> {
        let response = self
            .inner
            .http
            .post(self.inner.auth_endpoint("signup"))
            .header("apikey", &self.inner.key)
            .json(&json!({"email": email, "password": password, "data": metadata}))
            .send()
            .await
            .map_err(BackendError::from_transport)?;
        let (status, text) = read_response(response).await?;
        if !status.is_success() {
            return Err(classify_auth_failure(status, &ErrorBody::from_text(&text)));
        }

        let value: Value = serde_json::from_str(&text)?;
        if value.get("access_token").is_some() {
            let session = serde_json::from_value::<TokenResponse>(value)?.into_session();
            let session = self.adopt_session(session).await;
            Ok(AuthOutcome {
                user: Some(session.user.clone()),
                session: Some(session),
            })
        } else {
            // Confirmation-required deployments return only the identity record
            let user: AuthUser = serde_json::from_value(value)?;
            Ok(AuthOutcome {
                user: Some(user),
                session: None,
            })
        }
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthOutcome, BackendError> {
        let response = self
            .inner
            .http
            .post(self.inner.auth_endpoint("token"))
            .query(&[("grant_type", "password")])
            .header("apikey", &self.inner.key)
            .json(&json!({"email": email, "password": password}))
            .send()
            .await
            .map_err(BackendError::from_transport)?;
        let (status, text) = read_response(response).await?;
        if !status.is_success() {
            return Err(classify_auth_failure(status, &ErrorBody::from_text(&text)));
        }

        let session = serde_json::from_str::<TokenResponse>(&text)?.into_session();
        let session = self.adopt_session(session).await;
        Ok(AuthOutcome {
            user: Some(session.user.clone()),
            session: Some(session),
        })
    }

    async fn sign_out(&self) -> Result<(), BackendError> {
        let token = {
            let session = self.inner.session.read().await;
            session.as_ref().map(|s| s.access_token.clone())
        };

        let result = match token {
            None => Ok(()),
            Some(token) => {
                match self
                    .inner
                    .http
                    .post(self.inner.auth_endpoint("logout"))
                    .header("apikey", &self.inner.key)
                    .bearer_auth(token)
                    .send()
                    .await
                {
                    Err(e) => Err(BackendError::from_transport(e)),
                    Ok(response) => match read_response(response).await {
                        Err(e) => Err(e),
                        // A token the backend already rejected still counts as signed out
                        Ok((status, _)) if status.is_success() || status == StatusCode::UNAUTHORIZED => {
                            Ok(())
                        }
                        Ok((status, text)) => {
                            Err(classify_auth_failure(status, &ErrorBody::from_text(&text)))
                        }
                    },
                }
            }
        };

        // Local session clears even when the logout call failed
        self.store_session(None).await;
        let _ = self.inner.events.send(AuthChange {
            event: AuthEvent::SignedOut,
            session: None,
        });
        result
    }

    async fn get_user(&self) -> Result<Option<AuthUser>, BackendError> {
        let Some(session) = self.get_session().await? else {
            return Err(BackendError::SessionMissing);
        };

        let response = self
            .inner
            .http
            .get(self.inner.auth_endpoint("user"))
            .header("apikey", &self.inner.key)
            .bearer_auth(&session.access_token)
            .send()
            .await
            .map_err(BackendError::from_transport)?;
        let (status, text) = read_response(response).await?;
        if !status.is_success() {
            return Err(classify_auth_failure(status, &ErrorBody::from_text(&text)));
        }

        let user: AuthUser = serde_json::from_str(&text)?;
        Ok(Some(user))
    }

    async fn get_session(&self) -> Result<Option<Session>, BackendError> {
        let current = { self.inner.session.read().await.clone() };
        let margin = Duration::from_std(REFRESH_MARGIN).unwrap_or_else(|_| Duration::seconds(60));
        match current {
            None => Ok(None),
            Some(session) if !session.expires_within(margin) => Ok(Some(session)),
            Some(stale) => match refresh_session(&self.inner, &stale.refresh_token).await {
                Ok(fresh) => Ok(Some(fresh)),
                Err(e) => {
                    tracing::warn!("session refresh failed, treating session as gone: {e}");
                    self.store_session(None).await;
                    Ok(None)
                }
            },
        }
    }

    async fn reset_password_for_email(&self, email: &str) -> Result<(), BackendError> {
        let mut request = self
            .inner
            .http
            .post(self.inner.auth_endpoint("recover"))
            .header("apikey", &self.inner.key)
            .json(&json!({"email": email}));
        if let Some(redirect) = RESET_REDIRECT_URL.as_deref() {
            request = request.query(&[("redirect_to", redirect)]);
        }

        let response = request.send().await.map_err(BackendError::from_transport)?;
        let (status, text) = read_response(response).await?;
        if !status.is_success() {
            return Err(classify_auth_failure(status, &ErrorBody::from_text(&text)));
        }
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthChange> {
        self.inner.events.subscribe()
    }

    async fn fetch_profile(&self, id: Uuid) -> Result<UserProfile, BackendError> {
        let bearer = self.bearer_token().await;
        let response = self
            .inner
            .http
            .get(self.inner.table_endpoint())
            .query(&[("id", format!("eq.{id}")), ("select", "*".to_string())])
            .header("apikey", &self.inner.key)
            .header(header::ACCEPT, SINGLE_OBJECT)
            .bearer_auth(bearer)
            .send()
            .await
            .map_err(BackendError::from_transport)?;
        let (status, text) = read_response(response).await?;
        if !status.is_success() {
            return Err(classify_table_failure(status, &ErrorBody::from_text(&text)));
        }

        let profile: UserProfile = serde_json::from_str(&text)?;
        Ok(profile)
    }

    async fn insert_profile(&self, profile: &NewProfile) -> Result<UserProfile, BackendError> {
        let bearer = self.bearer_token().await;
        let response = self
            .inner
            .http
            .post(self.inner.table_endpoint())
            .header("apikey", &self.inner.key)
            .header(header::ACCEPT, SINGLE_OBJECT)
            .header("Prefer", "return=representation")
            .bearer_auth(bearer)
            .json(profile)
            .send()
            .await
            .map_err(BackendError::from_transport)?;
        let (status, text) = read_response(response).await?;
        if !status.is_success() {
            return Err(classify_table_failure(status, &ErrorBody::from_text(&text)));
        }

        let created: UserProfile = serde_json::from_str(&text)?;
        Ok(created)
    }

    async fn update_profile(
        &self,
        id: Uuid,
        changes: &ProfileChanges,
    ) -> Result<UserProfile, BackendError> {
        let bearer = self.bearer_token().await;
        let response = self
            .inner
            .http
            .patch(self.inner.table_endpoint())
            .query(&[("id", format!("eq.{id}"))])
            .header("apikey", &self.inner.key)
            .header(header::ACCEPT, SINGLE_OBJECT)
            .header("Prefer", "return=representation")
            .bearer_auth(bearer)
            .json(changes)
            .send()
            .await
            .map_err(BackendError::from_transport)?;
        let (status, text) = read_response(response).await?;
        if !status.is_success() {
            return Err(classify_table_failure(status, &ErrorBody::from_text(&text)));
        }

        let updated: UserProfile = serde_json::from_str(&text)?;
        Ok(updated)
    }
}

async fn read_response(response: Response) -> Result<(StatusCode, String), BackendError> {
    let status = response.status();
    let text = response
        .text()
        .await
        .map_err(BackendError::from_transport)?;
    Ok((status, text))
}

async fn probe(inner: &Inner) -> Result<(), BackendError> {
    let response = inner
        .http
        .get(inner.table_endpoint())
        .query(&[("select", "id"), ("limit", "1")])
        .header("apikey", &inner.key)
        .bearer_auth(&inner.key)
        .send()
        .await
        .map_err(BackendError::from_transport)?;
    let (status, text) = read_response(response).await?;
    if status.is_success() {
        Ok(())
    } else {
        Err(classify_table_failure(status, &ErrorBody::from_text(&text)))
    }
}

async fn refresh_session(inner: &Arc<Inner>, refresh_token: &str) -> Result<Session, BackendError> {
    let response = inner
        .http
        .post(inner.auth_endpoint("token"))
        .query(&[("grant_type", "refresh_token")])
        .header("apikey", &inner.key)
        .json(&json!({"refresh_token": refresh_token}))
        .send()
        .await
        .map_err(BackendError::from_transport)?;
    let (status, text) = read_response(response).await?;
    if !status.is_success() {
        return Err(classify_auth_failure(status, &ErrorBody::from_text(&text)));
    }

    let session = serde_json::from_str::<TokenResponse>(&text)?.into_session();
    persist_session(inner.session_file.as_deref(), Some(&session));
    *inner.session.write().await = Some(session.clone());
    let _ = inner.events.send(AuthChange {
        event: AuthEvent::TokenRefreshed,
        session: Some(session.clone()),
    });
    Ok(session)
}

fn schedule_refresh(inner: &Arc<Inner>) {
    let task_inner = inner.clone();
    let task = tokio::spawn(async move {
        loop {
            let expires_at = {
                let session = task_inner.session.read().await;
                session.as_ref().map(|s| s.expires_at)
            };
            let Some(expires_at) = expires_at else { return };

            let margin =
                Duration::from_std(REFRESH_MARGIN).unwrap_or_else(|_| Duration::seconds(60));
            if let Ok(wait) = ((expires_at - margin) - Utc::now()).to_std() {
                tokio::time::sleep(wait).await;
            }

            let refresh_token = {
                let session = task_inner.session.read().await;
                session.as_ref().map(|s| s.refresh_token.clone())
            };
            let Some(refresh_token) = refresh_token else { return };
            if let Err(e) = refresh_session(&task_inner, &refresh_token).await {
                tracing::warn!("background token refresh failed: {e}");
                return;
            }
        }
    });
    set_refresh_task(inner, Some(task));
}

fn set_refresh_task(inner: &Inner, task: Option<JoinHandle<()>>) {
    let mut guard = match inner.refresh_task.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    };
    if let Some(previous) = guard.take() {
        previous.abort();
    }
    *guard = task;
}

fn load_cached_session(path: &Path) -> Option<Session> {
    let text = std::fs::read_to_string(path).ok()?;
    match serde_json::from_str(&text) {
        Ok(session) => Some(session),
        Err(e) => {
            tracing::warn!("ignoring unreadable session cache {}: {e}", path.display());
            None
        }
    }
}

fn persist_session(path: Option<&Path>, session: Option<&Session>) {
    let Some(path) = path else { return };
    let result = match session {
        Some(session) => match serde_json::to_string(session) {
            Ok(text) => std::fs::write(path, text),
            Err(e) => {
                tracing::warn!("failed to encode session cache: {e}");
                return;
            }
        },
        None if path.exists() => std::fs::remove_file(path),
        None => Ok(()),
    };
    if let Err(e) = result {
        tracing::warn!("failed to update session cache {}: {e}", path.display());
    }
}

fn classify_auth_failure(status: StatusCode, body: &ErrorBody) -> BackendError {
    if let Some(code) = body.error_code.as_deref() {
        match code {
            "user_already_exists" | "email_exists" => return BackendError::AlreadyRegistered,
            "weak_password" => return BackendError::WeakPassword,
            "invalid_credentials" => return BackendError::InvalidCredentials,
            "email_not_confirmed" => return BackendError::EmailNotConfirmed,
            "over_request_rate_limit" | "over_email_send_rate_limit" => {
                return BackendError::RateLimited;
            }
            "session_not_found" | "session_expired" => return BackendError::SessionMissing,
            "bad_jwt" => return BackendError::TokenExpired,
            "email_address_invalid" | "validation_failed" => return BackendError::InvalidEmail,
            _ => {}
        }
    }

    // Older deployments classify only through the message text
    let message = body.message_or("");
    if message.contains("already registered") {
        BackendError::AlreadyRegistered
    } else if message.contains("Password should be at least") {
        BackendError::WeakPassword
    } else if message.contains("Invalid email") || message.contains("Unable to validate email") {
        BackendError::InvalidEmail
    } else if message.contains("Invalid login credentials") {
        BackendError::InvalidCredentials
    } else if message.contains("Email not confirmed") {
        BackendError::EmailNotConfirmed
    } else if message.contains("Too many requests") || status == StatusCode::TOO_MANY_REQUESTS {
        BackendError::RateLimited
    } else if message.contains("session missing") || message.contains("Auth session missing") {
        BackendError::SessionMissing
    } else if message.contains("JWT expired") {
        BackendError::TokenExpired
    } else if status == StatusCode::UNAUTHORIZED {
        BackendError::SessionMissing
    } else if message.is_empty() {
        BackendError::Backend(status.to_string())
    } else {
        BackendError::Backend(message.to_string())
    }
}

fn classify_table_failure(status: StatusCode, body: &ErrorBody) -> BackendError {
    if body.table_code() == Some("PGRST116") || status == StatusCode::NOT_ACCEPTABLE {
        return BackendError::NotFound;
    }
    if status == StatusCode::UNAUTHORIZED {
        let message = body.message_or("");
        return if message.contains("JWT expired") {
            BackendError::TokenExpired
        } else {
            BackendError::SessionMissing
        };
    }

    let message = body.message_or("");
    if message.is_empty() {
        BackendError::Backend(status.to_string())
    } else {
        BackendError::Backend(message.to_string())
    }
}
