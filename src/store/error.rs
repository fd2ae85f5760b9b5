//! Error types for store operations.

use thiserror::Error;

/// Failures surfaced by an [`ObjectStore`](super::ObjectStore)
/// implementation.
///
/// Every remote call collapses into one of these kinds so that callers can
/// tell "absent, create it" apart from "rejected, report it" without
/// inspecting message strings.
#[derive(Error, Debug, Clone)]
pub enum StoreError {
    /// Credentials were rejected by the auth endpoint.
    #[error("authentication rejected")]
    AuthRejected,

    /// The store refused the request (401/403).
    #[error("access denied")]
    AccessDenied,

    /// The account, container or object does not exist (404).
    #[error("not found")]
    NotFound,

    /// The request never completed (connection, timeout, ...).
    #[error("transport error: {0}")]
    Transport(String),

    /// The store answered with a body or headers this client cannot use.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// Any other HTTP status the store returned.
    #[error("unexpected status {0}")]
    UnexpectedStatus(u16),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound)
    }
}
