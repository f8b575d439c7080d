use axum::{
    Router,
    routing::{get, post},
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use studyhall_auth::{AuthCoordinator, AuthService};

mod handlers;

use crate::handlers::{
    AppState, health, profile, recover, retry_profile, signin, signout, signup, state,
    update_profile,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("{}=debug,studyhall_auth=debug", env!("CARGO_CRATE_NAME")).into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Select the backend (real or mock) and start the auth store
    let backend = studyhall_auth::init().await?;
    let app_state = AppState {
        service: AuthService::new(backend.clone()),
        auth: AuthCoordinator::start(backend),
    };

    let app = Router::new()
        .route("/", get(health))
        .route("/auth/state", get(state))
        .route("/auth/signup", post(signup))
        .route("/auth/signin", post(signin))
        .route("/auth/signout", post(signout))
        .route("/auth/recover", post(recover))
        .route("/profile", get(profile).patch(update_profile))
        .route("/profile/retry", post(retry_profile))
        .with_state(app_state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:3001").await?;
    tracing::info!("demo dashboard listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}
