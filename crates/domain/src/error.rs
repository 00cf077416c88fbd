//! Shared error type used across all Codial crates.
//!
//! Every variant maps to a stable wire code (`Error::wire_code`) and a
//! retryability class (`Error::retryable`). HTTP handlers and the event
//! stream serialize errors through [`ErrorEnvelope`] so external callers
//! never see Rust type names.

use serde::Serialize;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("auth: {0}")]
    Auth(String),

    #[error("provider auth failed: {0}")]
    ProviderAuth(String),

    #[error("rate limited: {0}")]
    RateLimited(String),

    #[error("bridge timeout: {0}")]
    BridgeTimeout(String),

    #[error("turn deadline exceeded after {0}s")]
    TurnTimeout(u64),

    #[error("bridge transport: {0}")]
    BridgeTransport(String),

    #[error("bridge protocol: {0}")]
    BridgeProtocol(String),

    #[error("MCP timeout: {0}")]
    McpTimeout(String),

    #[error("MCP: {0}")]
    Mcp(String),

    #[error("policy: {0}")]
    Policy(String),

    #[error("attachment rejected: {0}")]
    AttachmentRejected(String),

    #[error("session not found: {0}")]
    SessionNotFound(String),

    #[error("session {0} has ended")]
    SessionEnded(String),

    #[error("turn not found: {0}")]
    TurnNotFound(String),

    #[error("provider not enabled: {0}")]
    ProviderNotEnabled(String),

    #[error("subagent not found: {0}")]
    SubagentNotFound(String),

    #[error("turn queue is full")]
    QueueFull,

    #[error("tool budget exhausted after {0} rounds")]
    ToolBudgetExceeded(usize),

    #[error("cancelled")]
    Cancelled,

    #[error("shutting down")]
    Shutdown,

    #[error("rule index {0} is out of range")]
    IndexOutOfRange(usize),

    #[error("config: {0}")]
    Config(String),

    #[error("{0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// The stable wire code for this error. These strings are part of the
    /// external contract (HTTP envelopes and `error` stream events) and
    /// must not change between releases.
    pub fn wire_code(&self) -> &'static str {
        match self {
            Error::Io(_) => "FILES_IO",
            Error::Json(_) => "INTERNAL_DECODE",
            Error::Auth(_) => "AUTH_INVALID",
            Error::ProviderAuth(_) => "PROVIDER_AUTH_FAILED",
            Error::RateLimited(_) => "RATE_LIMITED",
            Error::BridgeTimeout(_) => "TIMEOUT_BRIDGE",
            Error::TurnTimeout(_) => "TIMEOUT_TURN",
            Error::BridgeTransport(_) => "BRIDGE_TRANSPORT",
            Error::BridgeProtocol(_) => "BRIDGE_PROTOCOL",
            Error::McpTimeout(_) => "MCP_TIMEOUT",
            Error::Mcp(_) => "MCP_PROTOCOL",
            Error::Policy(_) => "POLICY_INVALID",
            Error::AttachmentRejected(_) => "ATTACHMENT_REJECTED",
            Error::SessionNotFound(_) => "SESSION_NOT_FOUND",
            Error::SessionEnded(_) => "SESSION_ENDED",
            Error::TurnNotFound(_) => "SESSION_TURN_NOT_FOUND",
            Error::ProviderNotEnabled(_) => "PROVIDER_NOT_ENABLED",
            Error::SubagentNotFound(_) => "SUBAGENT_NOT_FOUND",
            Error::QueueFull => "QUEUE_FULL",
            Error::ToolBudgetExceeded(_) => "TOOL_BUDGET_EXCEEDED",
            Error::Cancelled => "CANCELLED",
            Error::Shutdown => "SHUTDOWN",
            Error::IndexOutOfRange(_) => "INDEX_OUT_OF_RANGE",
            Error::Config(_) => "INTERNAL_CONFIG",
            Error::Internal(_) => "INTERNAL",
        }
    }

    /// Whether a caller may reasonably retry the operation that produced
    /// this error. Transient transport classes are retryable; auth, config
    /// and state-machine violations are not.
    pub fn retryable(&self) -> bool {
        matches!(
            self,
            Error::RateLimited(_)
                | Error::BridgeTimeout(_)
                | Error::BridgeTransport(_)
                | Error::McpTimeout(_)
                | Error::QueueFull
        )
    }
}

/// The JSON error body returned by the REST API and carried in `error`
/// stream events: `{error_code, message, trace_id, retryable}`.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorEnvelope {
    pub error_code: String,
    pub message: String,
    pub trace_id: String,
    pub retryable: bool,
}

impl ErrorEnvelope {
    pub fn new(err: &Error, trace_id: impl Into<String>) -> Self {
        Self {
            error_code: err.wire_code().to_owned(),
            message: err.to_string(),
            trace_id: trace_id.into(),
            retryable: err.retryable(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_codes_are_stable() {
        assert_eq!(Error::QueueFull.wire_code(), "QUEUE_FULL");
        assert_eq!(Error::SessionEnded("s".into()).wire_code(), "SESSION_ENDED");
        assert_eq!(
            Error::ProviderNotEnabled("openai-api".into()).wire_code(),
            "PROVIDER_NOT_ENABLED"
        );
        assert_eq!(Error::ToolBudgetExceeded(5).wire_code(), "TOOL_BUDGET_EXCEEDED");
        assert_eq!(Error::Cancelled.wire_code(), "CANCELLED");
    }

    #[test]
    fn transient_classes_are_retryable() {
        assert!(Error::RateLimited("429".into()).retryable());
        assert!(Error::BridgeTimeout("t".into()).retryable());
        assert!(Error::QueueFull.retryable());

        assert!(!Error::Auth("bad token".into()).retryable());
        assert!(!Error::SessionEnded("s".into()).retryable());
        assert!(!Error::ToolBudgetExceeded(5).retryable());
    }

    #[test]
    fn envelope_carries_trace_id() {
        let env = ErrorEnvelope::new(&Error::QueueFull, "trace-1");
        assert_eq!(env.error_code, "QUEUE_FULL");
        assert_eq!(env.trace_id, "trace-1");
        assert!(env.retryable);

        let json = serde_json::to_value(&env).unwrap();
        assert_eq!(json["error_code"], "QUEUE_FULL");
        assert_eq!(json["retryable"], true);
    }
}
