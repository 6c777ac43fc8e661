use std::net::SocketAddr;

use axum::{
    Json,
    extract::{ConnectInfo, State, rejection::JsonRejection},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::json;
use time::OffsetDateTime;
use tower_cookies::Cookies;

use super::{AppState, ApiError};
use crate::{
    auth::{SESSION_COOKIE, removal_cookie, session_cookie},
    credentials::LoginError,
    session::SESSION_TTL,
};

/// Login request body
#[derive(Deserialize)]
pub struct LoginRequest {
    nip: String,
    password: String,
}

/// Handler for POST /auth/login
pub async fn handle_login(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    cookies: Cookies,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Response {
    let Ok(Json(request)) = payload else {
        return ApiError::BadRequest("Invalid request payload".to_string()).into_response();
    };

    match state
        .authenticator
        .login(&request.nip, &request.password, addr.ip())
        .await
    {
        Ok((token, _context)) => {
            let expires = cookie_expiry(state.clock.deadline_millis(SESSION_TTL));
            cookies.add(session_cookie(
                token,
                expires,
                state.config.server.secure_cookies,
            ));
            Json(json!({ "status": true, "message": "Login successful" })).into_response()
        }
        Err(e @ LoginError::InvalidCredentials) => {
            ApiError::Unauthorized(e.to_string()).into_response()
        }
        Err(e) => ApiError::Unavailable(e.to_string()).into_response(),
    }
}

/// Handler for POST /auth/logout
pub async fn handle_logout(State(state): State<AppState>, cookies: Cookies) -> Response {
    if let Some(cookie) = cookies.get(SESSION_COOKIE) {
        if let Err(e) = state.sessions.destroy(cookie.value()).await {
            tracing::warn!("Session could not be destroyed on logout: {e}");
        }
        cookies.remove(removal_cookie());
    }
    Json(json!({ "status": true, "message": "Logged out" })).into_response()
}

/// Handler for GET /auth/session
///
/// Resolves the cookie itself so it answers the same whether or not the
/// gate is in front of it.
pub async fn handle_session(State(state): State<AppState>, cookies: Cookies) -> Response {
    match state.resolver.resolve(&cookies).await {
        Ok(context) => Json(json!({ "status": true, "data": context })).into_response(),
        Err(e) => e.into_response(),
    }
}

fn cookie_expiry(deadline_millis: u64) -> OffsetDateTime {
    let secs = i64::try_from(deadline_millis / 1000).unwrap_or(i64::MAX);
    OffsetDateTime::from_unix_timestamp(secs)
        .unwrap_or_else(|_| OffsetDateTime::now_utc() + SESSION_TTL)
}
