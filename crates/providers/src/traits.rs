//! Provider-agnostic bridge request/reply types and the core trait.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use codial_domain::error::Result;
use codial_domain::turn::Attachment;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Request types
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// One tool surfaced to the model, derived from MCP `tools/list`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolManifestEntry {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

/// A tool invocation requested by the model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolRequest {
    pub tool_call_id: String,
    pub name: String,
    pub arguments: Value,
}

/// The outcome of one tool invocation, fed back into the next round.
/// Failed tool calls are carried here as errors, never retried in place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResultEntry {
    pub tool_call_id: String,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ToolResultEntry {
    pub fn success(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            tool_call_id: tool_call_id.into(),
            ok: true,
            content: Some(content.into()),
            error: None,
        }
    }

    pub fn failure(tool_call_id: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            tool_call_id: tool_call_id.into(),
            ok: false,
            content: None,
            error: Some(error.into()),
        }
    }
}

/// One round-trip to the bridge. The `idempotency_key` makes replays of
/// the same round safe under transport retries.
#[derive(Debug, Clone, Serialize)]
pub struct BridgeRequest {
    pub system_context: String,
    pub text: String,
    pub attachments: Vec<Attachment>,
    pub tool_manifest: Vec<ToolManifestEntry>,
    pub tool_results: Vec<ToolResultEntry>,
    pub model: String,
    pub idempotency_key: String,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Reply types
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Either the model finished, or it wants tools invoked first.
#[derive(Debug, Clone, PartialEq)]
pub enum BridgeOutcome {
    Final { text: String },
    ToolRequests(Vec<ToolRequest>),
}

/// One bridge reply: an optional plan (first round), any streamed text
/// deltas, and the outcome.
#[derive(Debug, Clone)]
pub struct BridgeReply {
    pub plan: Option<String>,
    pub deltas: Vec<String>,
    pub outcome: BridgeOutcome,
}

impl BridgeReply {
    pub fn terminal(text: impl Into<String>) -> Self {
        Self {
            plan: None,
            deltas: Vec::new(),
            outcome: BridgeOutcome::Final { text: text.into() },
        }
    }

    pub fn tool_requests(requests: Vec<ToolRequest>) -> Self {
        Self {
            plan: None,
            deltas: Vec::new(),
            outcome: BridgeOutcome::ToolRequests(requests),
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Core provider trait
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// The narrow capability every provider bridge implements. Adding a
/// provider means adding an implementation and a catalog entry; the turn
/// engine never sees vendor specifics.
#[async_trait::async_trait]
pub trait BridgeProvider: Send + Sync {
    /// Execute one round: send the accumulated context and tool results,
    /// receive either a terminal answer or a batch of tool requests.
    async fn run(&self, req: &BridgeRequest) -> Result<BridgeReply>;

    /// The catalog name of this provider (e.g. `"github-copilot-sdk"`).
    fn name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_result_entry_shapes() {
        let ok = ToolResultEntry::success("t1", "hello");
        assert!(ok.ok);
        assert_eq!(ok.content.as_deref(), Some("hello"));
        assert!(ok.error.is_none());

        let err = ToolResultEntry::failure("t2", "boom");
        assert!(!err.ok);
        assert_eq!(err.error.as_deref(), Some("boom"));

        let json = serde_json::to_value(&err).unwrap();
        assert!(json.get("content").is_none(), "absent fields are omitted");
    }

    #[test]
    fn tool_request_round_trips() {
        let req = ToolRequest {
            tool_call_id: "t1".into(),
            name: "fs.read".into(),
            arguments: serde_json::json!({ "path": "a" }),
        };
        let json = serde_json::to_string(&req).unwrap();
        let parsed: ToolRequest = serde_json::from_str(&json).unwrap();
        assert_eq!(req, parsed);
    }
}
