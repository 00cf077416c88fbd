//! Session data model.
//!
//! A session is the lifetime unit of an interaction, bound to one Discord
//! channel. It is created by the REST API, mutated by config endpoints,
//! transitions to `ended` exactly once, and is never resurrected (ended
//! sessions remain addressable for inspection but reject writes).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Active,
    Ended,
}

/// Per-session configuration. Defaults are seeded from `AGENTS.md` at
/// session-create time; after that the session owns its config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Provider name; must be in the operator-enabled set.
    pub provider: String,
    /// Free-form model identifier passed through to the bridge.
    pub model: String,
    pub mcp_enabled: bool,
    pub mcp_profile_name: String,
    /// Optional subagent profile; must resolve to a known definition.
    #[serde(default)]
    pub subagent_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub session_id: String,
    pub guild_id: String,
    pub requester_id: String,
    /// Discord channel the session is bound to. `None` until the gateway
    /// has created the session channel and called bind-channel.
    pub channel_id: Option<String>,
    pub status: SessionStatus,
    pub config: SessionConfig,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub ended_at: Option<DateTime<Utc>>,
}

impl Session {
    pub fn new(
        guild_id: impl Into<String>,
        requester_id: impl Into<String>,
        config: SessionConfig,
    ) -> Self {
        Self {
            session_id: uuid::Uuid::new_v4().to_string(),
            guild_id: guild_id.into(),
            requester_id: requester_id.into(),
            channel_id: None,
            status: SessionStatus::Active,
            config,
            created_at: Utc::now(),
            ended_at: None,
        }
    }

    pub fn is_ended(&self) -> bool {
        self.status == SessionStatus::Ended
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> SessionConfig {
        SessionConfig {
            provider: "github-copilot-sdk".into(),
            model: "gpt-4o".into(),
            mcp_enabled: false,
            mcp_profile_name: "default".into(),
            subagent_name: None,
        }
    }

    #[test]
    fn new_session_is_active_and_unbound() {
        let s = Session::new("g1", "u1", config());
        assert_eq!(s.status, SessionStatus::Active);
        assert!(s.channel_id.is_none());
        assert!(s.ended_at.is_none());
        assert!(!s.is_ended());
    }

    #[test]
    fn status_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&SessionStatus::Ended).unwrap(),
            "\"ended\""
        );
    }
}
