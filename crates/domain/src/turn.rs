//! Turn and attachment data model.
//!
//! A turn is one user request → agent response cycle inside a session.
//! It is created by turn submission, mutated only by the owning worker,
//! and terminal on `completed` or `failed`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnStatus {
    Queued,
    Running,
    Completed,
    Failed,
}

impl TurnStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TurnStatus::Completed | TurnStatus::Failed)
    }
}

/// A Discord attachment reference. `local_path` is set once the ingest
/// step has fetched the file into local storage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attachment {
    pub attachment_id: String,
    pub filename: String,
    pub content_type: String,
    pub size: u64,
    pub url: String,
    #[serde(default)]
    pub local_path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    pub turn_id: String,
    pub session_id: String,
    pub user_id: String,
    pub channel_id: String,
    pub text: String,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    pub idempotency_key: String,
    pub trace_id: String,
    pub status: TurnStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub ended_at: Option<DateTime<Utc>>,
    /// Wire code of the failure, when `status == Failed`.
    #[serde(default)]
    pub error_code: Option<String>,
}

impl Turn {
    pub fn new(
        session_id: impl Into<String>,
        user_id: impl Into<String>,
        channel_id: impl Into<String>,
        text: impl Into<String>,
        attachments: Vec<Attachment>,
        idempotency_key: impl Into<String>,
    ) -> Self {
        Self {
            turn_id: uuid::Uuid::new_v4().to_string(),
            session_id: session_id.into(),
            user_id: user_id.into(),
            channel_id: channel_id.into(),
            text: text.into(),
            attachments,
            idempotency_key: idempotency_key.into(),
            trace_id: uuid::Uuid::new_v4().to_string(),
            status: TurnStatus::Queued,
            created_at: Utc::now(),
            started_at: None,
            ended_at: None,
            error_code: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_turn_is_queued() {
        let t = Turn::new("s1", "u1", "c1", "hello", Vec::new(), "k1");
        assert_eq!(t.status, TurnStatus::Queued);
        assert!(t.started_at.is_none());
        assert!(!t.status.is_terminal());
    }

    #[test]
    fn terminal_statuses() {
        assert!(TurnStatus::Completed.is_terminal());
        assert!(TurnStatus::Failed.is_terminal());
        assert!(!TurnStatus::Queued.is_terminal());
        assert!(!TurnStatus::Running.is_terminal());
    }
}
