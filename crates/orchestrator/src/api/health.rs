//! Health probes (unauthenticated).

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};

use crate::state::AppState;

/// `GET /v1/health/live` — process is up.
pub async fn live() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

/// `GET /v1/health/ready` — config required for real traffic is present.
pub async fn ready(State(state): State<AppState>) -> impl IntoResponse {
    let mut missing = Vec::new();
    if state.config.server.api_token.is_none() {
        missing.push("CORE_API_TOKEN");
    }
    if state.config.gateway.base_url.is_empty() {
        missing.push("CORE_GATEWAY_BASE_URL");
    }

    if missing.is_empty() {
        (
            StatusCode::OK,
            Json(serde_json::json!({ "status": "ready" })),
        )
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(serde_json::json!({
                "status": "not_ready",
                "missing": missing,
            })),
        )
    }
}
