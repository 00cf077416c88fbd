//! Session management API endpoints.

use axum::extract::{Path, State};
use axum::response::{IntoResponse, Json, Response};
use serde::{Deserialize, Serialize};

use codial_domain::error::Result;
use codial_domain::session::{Session, SessionConfig};

use crate::api::error::ApiError;
use crate::runtime::idempotency::Scope;
use crate::state::AppState;

fn new_trace_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// `{session_id, provider, model, mcp_enabled, mcp_profile_name,
/// subagent_name}` — returned by every config mutation.
#[derive(Debug, Serialize)]
pub struct SessionConfigResponse {
    pub session_id: String,
    pub provider: String,
    pub model: String,
    pub mcp_enabled: bool,
    pub mcp_profile_name: String,
    pub subagent_name: Option<String>,
}

impl From<&Session> for SessionConfigResponse {
    fn from(session: &Session) -> Self {
        Self {
            session_id: session.session_id.clone(),
            provider: session.config.provider.clone(),
            model: session.config.model.clone(),
            mcp_enabled: session.config.mcp_enabled,
            mcp_profile_name: session.config.mcp_profile_name.clone(),
            subagent_name: session.config.subagent_name.clone(),
        }
    }
}

fn config_response(result: Result<Session>, trace_id: &str) -> Response {
    match result {
        Ok(session) => Json(SessionConfigResponse::from(&session)).into_response(),
        Err(e) => ApiError::new(&e, trace_id).into_response(),
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// POST /v1/sessions
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Deserialize)]
pub struct CreateSessionBody {
    pub guild_id: String,
    pub requester_id: String,
    pub idempotency_key: String,
}

/// Create a session, seeding its config from `AGENTS.md` defaults.
/// Idempotent on `idempotency_key`: a repeat within the TTL returns the
/// original response and creates nothing.
pub async fn create_session(
    State(state): State<AppState>,
    Json(body): Json<CreateSessionBody>,
) -> Response {
    let trace_id = new_trace_id();

    let result = state
        .idempotency
        .execute(Scope::SessionCreate, &body.idempotency_key, async {
            let config = seed_config(&state)?;
            let session = state
                .sessions
                .create(&body.guild_id, &body.requester_id, config);
            Ok(serde_json::json!({
                "session_id": session.session_id,
                "status": session.status,
            }))
        })
        .await;

    match result {
        Ok(response) => Json(response).into_response(),
        Err(e) => ApiError::new(&e, &trace_id).into_response(),
    }
}

/// Session defaults: `AGENTS.md` declarations win over the operator
/// config, but a declared provider outside the enabled set falls back.
fn seed_config(state: &AppState) -> Result<SessionConfig> {
    let snapshot = state.policy.load()?;
    let defaults = &snapshot.defaults;
    let providers = &state.config.providers;

    let provider = defaults
        .default_provider
        .clone()
        .filter(|p| providers.is_enabled(p))
        .unwrap_or_else(|| providers.default_provider.clone());

    Ok(SessionConfig {
        provider,
        model: defaults.default_model.clone().unwrap_or_default(),
        mcp_enabled: defaults.default_mcp_enabled.unwrap_or(false),
        mcp_profile_name: defaults
            .default_mcp_profile
            .clone()
            .unwrap_or_else(|| "default".into()),
        subagent_name: None,
    })
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// GET /v1/sessions, GET /v1/sessions/:id
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub async fn list_sessions(State(state): State<AppState>) -> impl IntoResponse {
    let sessions = state.sessions.list();
    let count = sessions.len();
    Json(serde_json::json!({
        "sessions": sessions,
        "count": count,
    }))
}

/// Ended sessions remain addressable for inspection.
pub async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Response {
    let trace_id = new_trace_id();
    match state.sessions.get(&id) {
        Ok(session) => Json(session).into_response(),
        Err(e) => ApiError::new(&e, &trace_id).into_response(),
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// POST /v1/sessions/:id/bind-channel
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Deserialize)]
pub struct BindChannelBody {
    pub channel_id: String,
}

pub async fn bind_channel(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<BindChannelBody>,
) -> Response {
    let trace_id = new_trace_id();
    match state.sessions.bind_channel(&id, &body.channel_id) {
        Ok(session) => Json(serde_json::json!({
            "session_id": session.session_id,
            "channel_id": session.channel_id,
            "status": session.status,
        }))
        .into_response(),
        Err(e) => ApiError::new(&e, &trace_id).into_response(),
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// POST /v1/sessions/:id/end
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// End the session (idempotent) and cancel any in-flight turn.
pub async fn end_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Response {
    let trace_id = new_trace_id();
    match state.sessions.end(&id) {
        Ok(session) => {
            if state.cancel_map.cancel(&id) {
                tracing::info!(session_id = %id, "cancelled in-flight turn on session end");
            }
            Json(serde_json::json!({
                "session_id": session.session_id,
                "status": session.status,
            }))
            .into_response()
        }
        Err(e) => ApiError::new(&e, &trace_id).into_response(),
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Config mutations
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Deserialize)]
pub struct SetProviderBody {
    pub provider: String,
}

pub async fn set_provider(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<SetProviderBody>,
) -> Response {
    let trace_id = new_trace_id();
    config_response(state.sessions.set_provider(&id, &body.provider), &trace_id)
}

#[derive(Debug, Deserialize)]
pub struct SetModelBody {
    pub model: String,
}

pub async fn set_model(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<SetModelBody>,
) -> Response {
    let trace_id = new_trace_id();
    config_response(state.sessions.set_model(&id, &body.model), &trace_id)
}

#[derive(Debug, Deserialize)]
pub struct SetMcpBody {
    pub enabled: bool,
    #[serde(default)]
    pub profile_name: Option<String>,
}

pub async fn set_mcp(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<SetMcpBody>,
) -> Response {
    let trace_id = new_trace_id();
    let profile = body.profile_name.as_deref().unwrap_or("default");
    config_response(state.sessions.set_mcp(&id, body.enabled, profile), &trace_id)
}

#[derive(Debug, Deserialize)]
pub struct SetSubagentBody {
    pub name: Option<String>,
}

pub async fn set_subagent(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<SetSubagentBody>,
) -> Response {
    let trace_id = new_trace_id();
    config_response(
        state.sessions.set_subagent(&id, body.name.as_deref()),
        &trace_id,
    )
}
