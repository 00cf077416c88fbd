//! `CODIAL.md` rules endpoints.
//!
//! - `GET    /v1/codial/rules` — list (1-indexed externally)
//! - `POST   /v1/codial/rules` — append `{rule}`
//! - `DELETE /v1/codial/rules` — remove `{index}` (1-based)

use axum::extract::State;
use axum::response::{IntoResponse, Json, Response};
use serde::Deserialize;

use crate::api::error::ApiError;
use crate::state::AppState;

fn rules_json(rules: Vec<String>) -> Json<serde_json::Value> {
    let count = rules.len();
    Json(serde_json::json!({
        "rules": rules,
        "count": count,
    }))
}

pub async fn list_rules(State(state): State<AppState>) -> Response {
    let trace_id = uuid::Uuid::new_v4().to_string();
    match state.rules.list() {
        Ok(rules) => rules_json(rules).into_response(),
        Err(e) => ApiError::new(&e, &trace_id).into_response(),
    }
}

#[derive(Debug, Deserialize)]
pub struct AppendRuleBody {
    pub rule: String,
}

pub async fn append_rule(
    State(state): State<AppState>,
    Json(body): Json<AppendRuleBody>,
) -> Response {
    let trace_id = uuid::Uuid::new_v4().to_string();
    match state.rules.append(&body.rule) {
        Ok(rules) => rules_json(rules).into_response(),
        Err(e) => ApiError::new(&e, &trace_id).into_response(),
    }
}

#[derive(Debug, Deserialize)]
pub struct RemoveRuleBody {
    pub index: usize,
}

pub async fn remove_rule(
    State(state): State<AppState>,
    Json(body): Json<RemoveRuleBody>,
) -> Response {
    let trace_id = uuid::Uuid::new_v4().to_string();
    match state.rules.remove(body.index) {
        Ok(rules) => rules_json(rules).into_response(),
        Err(e) => ApiError::new(&e, &trace_id).into_response(),
    }
}
