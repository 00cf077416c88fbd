//! Progress events pushed to the Discord gateway.
//!
//! Every event carries `(session_id, turn_id, type, payload)`. Events from
//! one turn are delivered in emission order; events from different turns
//! may interleave.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The event kinds a turn may emit, in the order a well-behaved turn
/// typically produces them: `plan` → `action`/`decision_summary` rounds →
/// `response_delta` → `final` (or `error`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    Plan,
    Action,
    DecisionSummary,
    ResponseDelta,
    Final,
    Error,
}

/// One structured progress event, as serialized to the gateway's
/// `/internal/stream-events` endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub session_id: String,
    pub turn_id: String,
    #[serde(rename = "type")]
    pub event_type: EventType,
    pub payload: Value,
}

impl ProgressEvent {
    pub fn new(
        session_id: impl Into<String>,
        turn_id: impl Into<String>,
        event_type: EventType,
        payload: Value,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            turn_id: turn_id.into(),
            event_type,
            payload,
        }
    }

    /// Shorthand for the common `{ "text": ... }` payload shape.
    pub fn text(
        session_id: impl Into<String>,
        turn_id: impl Into<String>,
        event_type: EventType,
        text: impl Into<String>,
    ) -> Self {
        Self::new(
            session_id,
            turn_id,
            event_type,
            serde_json::json!({ "text": text.into() }),
        )
    }
}
