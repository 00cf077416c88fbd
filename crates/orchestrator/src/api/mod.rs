pub mod auth;
pub mod error;
pub mod health;
pub mod rules;
pub mod sessions;
pub mod turns;

use axum::middleware;
use axum::routing::{delete, get, post};
use axum::Router;

use crate::state::AppState;

/// Build the full API router.
///
/// Routes are split into **public** (health probes) and **protected**
/// (gated behind the `CORE_API_TOKEN` bearer middleware).
pub fn router(state: AppState) -> Router<AppState> {
    let public = Router::new()
        .route("/v1/health/live", get(health::live))
        .route("/v1/health/ready", get(health::ready));

    let protected = Router::new()
        // Sessions
        .route("/v1/sessions", post(sessions::create_session))
        .route("/v1/sessions", get(sessions::list_sessions))
        .route("/v1/sessions/:id", get(sessions::get_session))
        .route("/v1/sessions/:id/bind-channel", post(sessions::bind_channel))
        .route("/v1/sessions/:id/end", post(sessions::end_session))
        .route("/v1/sessions/:id/provider", post(sessions::set_provider))
        .route("/v1/sessions/:id/model", post(sessions::set_model))
        .route("/v1/sessions/:id/mcp", post(sessions::set_mcp))
        .route("/v1/sessions/:id/subagent", post(sessions::set_subagent))
        // Turns
        .route("/v1/sessions/:id/turns", post(turns::submit_turn))
        .route("/v1/sessions/:id/turns", get(turns::list_turns))
        .route("/v1/sessions/:id/turns/:turn_id", get(turns::get_turn))
        // Rules
        .route("/v1/codial/rules", get(rules::list_rules))
        .route("/v1/codial/rules", post(rules::append_rule))
        .route("/v1/codial/rules", delete(rules::remove_rule))
        .layer(middleware::from_fn_with_state(
            state,
            auth::require_api_token,
        ));

    public.merge(protected)
}
