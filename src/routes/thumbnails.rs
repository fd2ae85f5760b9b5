//! Thumbnail serving route

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::Response;
use axum::routing::get;
use axum::Router;

use super::Session;
use crate::error::{AppError, Result};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/:container/*name", get(serve_thumbnail))
}

async fn serve_thumbnail(
    State(state): State<AppState>,
    Session(session): Session,
    Path((container, name)): Path<(String, String)>,
) -> Result<Response> {
    // The thumbnail service account looking at its own artifacts would
    // recurse the cache into itself.
    if session.username == state.thumbnails().service_username() {
        return Err(AppError::AccessDenied("Access denied.".to_string()));
    }

    let (content_type, bytes) = state
        .thumbnails()
        .serve(&session, &container, &name)
        .await?;

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CACHE_CONTROL, "private, max-age=60")
        .body(Body::from(bytes))
        .map_err(|e| AppError::Internal(e.to_string()))
}
