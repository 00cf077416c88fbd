//! Turn submission and inspection endpoints.

use axum::extract::{Path, State};
use axum::response::{IntoResponse, Json, Response};
use serde::Deserialize;

use codial_domain::error::Error;
use codial_domain::turn::{Attachment, Turn};

use crate::api::error::ApiError;
use crate::runtime::idempotency::Scope;
use crate::runtime::queue::QueuedTurn;
use crate::state::AppState;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// POST /v1/sessions/:id/turns
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Deserialize)]
pub struct SubmitTurnBody {
    pub user_id: String,
    pub channel_id: String,
    pub text: String,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    pub idempotency_key: String,
}

/// Accept a turn: 409 if the session has ended, 503 on queue
/// saturation. Idempotent on `idempotency_key` — a repeat yields the
/// original `turn_id` and no second execution.
pub async fn submit_turn(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<SubmitTurnBody>,
) -> Response {
    let trace_id = uuid::Uuid::new_v4().to_string();

    let result = state
        .idempotency
        .execute(Scope::TurnSubmit, &body.idempotency_key, async {
            // Reject before creating any record.
            let session = state.sessions.get(&id)?;
            if session.is_ended() {
                return Err(Error::SessionEnded(id.clone()));
            }

            let turn = Turn::new(
                &id,
                &body.user_id,
                &body.channel_id,
                &body.text,
                body.attachments.clone(),
                &body.idempotency_key,
            );
            let turn_id = turn.turn_id.clone();
            let queued = QueuedTurn {
                turn_id: turn_id.clone(),
                session_id: id.clone(),
            };
            let response = serde_json::json!({
                "status": "accepted",
                "trace_id": turn.trace_id.clone(),
                "turn_id": turn_id.clone(),
            });

            state.turns.insert(turn);
            if let Err(e) = state.queue.submit(queued) {
                // Don't leave a phantom `queued` record behind.
                state.turns.mark_failed(&turn_id, e.wire_code());
                return Err(e);
            }
            tracing::info!(session_id = %id, turn_id = %turn_id, "turn accepted");
            Ok(response)
        })
        .await;

    match result {
        Ok(response) => Json(response).into_response(),
        Err(e) => ApiError::new(&e, &trace_id).into_response(),
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// GET /v1/sessions/:id/turns
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Turns of a session in acceptance order (ended sessions included).
pub async fn list_turns(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Response {
    let trace_id = uuid::Uuid::new_v4().to_string();
    if let Err(e) = state.sessions.get(&id) {
        return ApiError::new(&e, &trace_id).into_response();
    }
    let turns = state.turns.list_for_session(&id);
    let count = turns.len();
    Json(serde_json::json!({
        "turns": turns,
        "count": count,
    }))
    .into_response()
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// GET /v1/sessions/:id/turns/:turn_id
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub async fn get_turn(
    State(state): State<AppState>,
    Path((session_id, turn_id)): Path<(String, String)>,
) -> Response {
    let trace_id = uuid::Uuid::new_v4().to_string();
    match state.turns.get(&turn_id) {
        Ok(turn) if turn.session_id == session_id => Json(turn).into_response(),
        _ => ApiError::new(&Error::TurnNotFound(turn_id), &trace_id).into_response(),
    }
}
