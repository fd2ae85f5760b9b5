//! Error types for the swiftdeck server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Application-wide result type
pub type Result<T> = std::result::Result<T, AppError>;

/// The closed set of failure kinds a core operation may surface.
///
/// Low-level store failures never escape a component; each operation maps
/// them into one of these so the web layer can choose a status and message
/// without inspecting strings.
#[derive(Error, Debug)]
pub enum AppError {
    /// The store (or an ownership guard) rejected the request.
    #[error("Access denied: {0}")]
    AccessDenied(String),

    /// Nothing to show; in provisioning paths this is handled internally
    /// as "create on demand" and never reaches the caller.
    #[error("Not found: {0}")]
    NotFound(String),

    /// A required upstream read failed with no recovery for this request.
    #[error("Upstream storage failure: {0}")]
    Upstream(String),

    /// A multi-step operation failed partway. Details are logged with
    /// context; the response body stays generic.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: &'static str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, message) = match &self {
            AppError::AccessDenied(msg) => {
                (StatusCode::FORBIDDEN, "access_denied", msg.clone())
            }
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg.clone()),
            AppError::Upstream(msg) => {
                tracing::error!("Upstream failure: {}", msg);
                (
                    StatusCode::BAD_GATEWAY,
                    "upstream_error",
                    "Storage backend failure".to_string(),
                )
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = Json(ErrorResponse { error, message });
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let response = AppError::AccessDenied("denied".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let response = AppError::NotFound("gone".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = AppError::Upstream("source object missing".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

        let response = AppError::Internal("partial restore".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
