//! Request authentication errors.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// Why a request could not be tied to a session.
///
/// Carries no token material; safe to log and to return to clients.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AuthError {
    /// The request presented no session token, or an empty one.
    #[error("No session token presented")]
    MissingToken,

    /// The token names no live session: unknown, expired, or logged out.
    #[error("Session is invalid or expired")]
    InvalidSession,

    /// The session store could not answer.
    #[error("Session store unavailable")]
    StoreUnavailable,
}

impl AuthError {
    /// Stable machine-readable name, used in response bodies.
    pub fn classification(&self) -> &'static str {
        match self {
            AuthError::MissingToken => "missing_token",
            AuthError::InvalidSession => "invalid_session",
            AuthError::StoreUnavailable => "store_unavailable",
        }
    }

    pub fn is_missing_token(&self) -> bool {
        matches!(self, AuthError::MissingToken)
    }

    pub fn is_invalid_session(&self) -> bool {
        matches!(self, AuthError::InvalidSession)
    }

    pub fn is_store_unavailable(&self) -> bool {
        matches!(self, AuthError::StoreUnavailable)
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        // Store outages also reject with 401; the request is never let through.
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({
                "status": false,
                "error": self.classification(),
                "message": self.to_string(),
            })),
        )
            .into_response()
    }
}
