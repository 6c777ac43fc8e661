use std::collections::BTreeMap;

use axum::{Json, extract::State, http::StatusCode};
use serde::Serialize;

use super::AppState;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: &'static str,
    databases: BTreeMap<String, bool>,
    kv: &'static str,
}

/// Handler for GET /health - Health check endpoint
///
/// 200 when every backend answers, 503 otherwise.
pub async fn handle_health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let databases: BTreeMap<String, bool> = state.registry.check_all().await.into_iter().collect();

    let kv_ok = match state.sessions.kv().ping().await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!("Key-value store ping failed: {e}");
            false
        }
    };

    let healthy = kv_ok && databases.values().all(|ok| *ok);
    let response = HealthResponse {
        status: if healthy { "healthy" } else { "degraded" },
        databases,
        kv: if kv_ok { "ok" } else { "unavailable" },
    };
    let code = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (code, Json(response))
}
