//! Route modules for the swiftdeck server
//!
//! Handlers are thin: they pull the storage session out of request
//! headers, call into the managers, and map results onto JSON responses.
//! Session material never touches server-side storage — the browser owns
//! it and replays it per request.

pub mod auth;
pub mod containers;
pub mod objects;
pub mod thumbnails;
pub mod trash;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;

use crate::error::AppError;
use crate::state::AppState;
use crate::store::StorageSession;

/// Storage session extracted from the `X-Storage-Url`, `X-Auth-Token` and
/// `X-Auth-User` request headers.
pub struct Session(pub StorageSession);

#[axum::async_trait]
impl<S> FromRequestParts<S> for Session
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = |name: &str| {
            parts
                .headers
                .get(name)
                .and_then(|value| value.to_str().ok())
                .map(str::to_string)
        };
        let storage_url = header("x-storage-url")
            .ok_or_else(|| AppError::AccessDenied("missing X-Storage-Url header".to_string()))?;
        let auth_token = header("x-auth-token")
            .ok_or_else(|| AppError::AccessDenied("missing X-Auth-Token header".to_string()))?;
        let username = header("x-auth-user").unwrap_or_default();
        Ok(Session(StorageSession {
            storage_url,
            auth_token,
            username,
        }))
    }
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Assemble the full application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .nest("/api/auth", auth::router())
        .nest(
            "/api/containers",
            containers::router()
                .merge(objects::router())
                .merge(trash::containers_router()),
        )
        .nest("/api/public", objects::public_router())
        .nest("/api/trash", trash::router())
        .nest("/api/thumbnails", thumbnails::router())
        .with_state(state)
}
