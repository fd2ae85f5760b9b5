//! Login passthrough
//!
//! Exchanges credentials against the configured auth endpoint and hands
//! the resulting session material back to the browser, which replays it in
//! headers on every later request.

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;

use crate::error::{AppError, Result};
use crate::state::AppState;
use crate::store::{ObjectStore, StorageSession};

pub fn router() -> Router<AppState> {
    Router::new().route("/login", post(login))
}

#[derive(Deserialize)]
struct LoginRequest {
    username: String,
    password: String,
}

async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<StorageSession>> {
    let swift = &state.config().swift;
    let session = state
        .store()
        .authenticate(
            &swift.auth_url,
            &request.username,
            &request.password,
            swift.auth_version,
        )
        .await
        .map_err(|e| {
            tracing::info!("Login failed for {}: {}", request.username, e);
            AppError::AccessDenied("Login failed.".to_string())
        })?;
    Ok(Json(session))
}
