use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use studyhall_auth::{
    AuthCoordinator, AuthService, AuthSnapshot, ProfileChanges, SignInData, SignUpData,
    UserProfile,
};

#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<AuthCoordinator>,
    pub service: AuthService,
}

/// Read-model view handed to the client; tokens stay server-side
#[derive(Serialize)]
pub struct StateView {
    authenticated: bool,
    loading: bool,
    error: Option<String>,
    user: Option<UserView>,
    profile: Option<UserProfile>,
}

#[derive(Serialize)]
pub struct UserView {
    id: Uuid,
    email: Option<String>,
}

impl From<AuthSnapshot> for StateView {
    fn from(snapshot: AuthSnapshot) -> Self {
        Self {
            authenticated: snapshot.is_authenticated(),
            loading: snapshot.loading,
            error: snapshot.error,
            user: snapshot.user.map(|u| UserView {
                id: u.id,
                email: u.email,
            }),
            profile: snapshot.profile,
        }
    }
}

#[derive(Deserialize)]
pub struct RecoverRequest {
    email: String,
}

pub async fn health() -> Json<serde_json::Value> {
    Json(json!({"status": "ok"}))
}

pub async fn state(State(app): State<AppState>) -> Json<StateView> {
    Json(app.auth.snapshot().into())
}

pub async fn signup(State(app): State<AppState>, Json(data): Json<SignUpData>) -> Response {
    match app.auth.sign_up(&data).await {
        Ok(()) => Json(StateView::from(app.auth.snapshot())).into_response(),
        Err(e) => error_response(StatusCode::UNPROCESSABLE_ENTITY, e.to_string()),
    }
}

pub async fn signin(State(app): State<AppState>, Json(data): Json<SignInData>) -> Response {
    match app.auth.sign_in(&data).await {
        Ok(()) => Json(StateView::from(app.auth.snapshot())).into_response(),
        Err(e) => error_response(StatusCode::UNAUTHORIZED, e.to_string()),
    }
}

pub async fn signout(State(app): State<AppState>) -> Response {
    match app.auth.sign_out().await {
        Ok(()) => Json(StateView::from(app.auth.snapshot())).into_response(),
        Err(e) => error_response(StatusCode::BAD_GATEWAY, e.to_string()),
    }
}

pub async fn recover(State(app): State<AppState>, Json(data): Json<RecoverRequest>) -> Response {
    match app.service.reset_password(&data.email).await {
        Ok(()) => Json(json!({"sent": true})).into_response(),
        Err(e) => error_response(StatusCode::UNPROCESSABLE_ENTITY, e.to_string()),
    }
}

pub async fn profile(State(app): State<AppState>) -> Response {
    match app.auth.snapshot().profile {
        Some(profile) => Json(profile).into_response(),
        None => error_response(StatusCode::NOT_FOUND, "no profile yet".to_string()),
    }
}

pub async fn update_profile(
    State(app): State<AppState>,
    Json(changes): Json<ProfileChanges>,
) -> Response {
    match app.auth.update_profile(&changes).await {
        Ok(profile) => Json(profile).into_response(),
        Err(e) => error_response(StatusCode::UNPROCESSABLE_ENTITY, e.to_string()),
    }
}

pub async fn retry_profile(State(app): State<AppState>) -> Response {
    app.auth.retry_profile_load().await;
    Json(StateView::from(app.auth.snapshot())).into_response()
}

fn error_response(status: StatusCode, message: String) -> Response {
    (status, Json(json!({"error": message}))).into_response()
}
