//! API authentication middleware.
//!
//! `CORE_API_TOKEN` is read **once at startup** and cached as a SHA-256
//! digest in `AppState`.
//! - If set, every protected request must carry
//!   `Authorization: Bearer <token>`.
//! - If unset, the server logs a warning at boot and allows
//!   unauthenticated access (dev mode).

use axum::body::Body;
use axum::extract::State;
use axum::http::Request;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use codial_domain::error::{Error, ErrorEnvelope};

use crate::state::AppState;

/// Axum middleware enforcing bearer-token auth on protected routes.
/// Attach via `axum::middleware::from_fn_with_state`.
pub async fn require_api_token(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let expected_hash = match &state.api_token_hash {
        Some(h) => h,
        None => return next.run(req).await,
    };

    let provided = req
        .headers()
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .unwrap_or("");

    // Hash the presented token to a fixed-length digest, then compare in
    // constant time so the token length never leaks.
    let provided_hash = Sha256::digest(provided.as_bytes());

    if !bool::from(provided_hash.ct_eq(expected_hash.as_slice())) {
        let envelope = ErrorEnvelope::new(
            &Error::Auth("invalid or missing API token".into()),
            uuid::Uuid::new_v4().to_string(),
        );
        return (axum::http::StatusCode::UNAUTHORIZED, axum::Json(envelope)).into_response();
    }

    next.run(req).await
}
