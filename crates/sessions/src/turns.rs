//! Turn record tracking.
//!
//! Turns are owned by the store while queued and by the executing worker
//! while running; only the owning worker moves a turn to its terminal
//! status.

use std::collections::HashMap;

use chrono::Utc;
use parking_lot::RwLock;

use codial_domain::error::{Error, Result};
use codial_domain::turn::{Turn, TurnStatus};

#[derive(Default)]
pub struct TurnStore {
    turns: RwLock<HashMap<String, Turn>>,
}

impl TurnStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, turn: Turn) {
        self.turns.write().insert(turn.turn_id.clone(), turn);
    }

    pub fn get(&self, turn_id: &str) -> Result<Turn> {
        self.turns
            .read()
            .get(turn_id)
            .cloned()
            .ok_or_else(|| Error::TurnNotFound(turn_id.to_owned()))
    }

    pub fn mark_running(&self, turn_id: &str) {
        self.update(turn_id, |t| {
            t.status = TurnStatus::Running;
            t.started_at = Some(Utc::now());
        });
    }

    pub fn mark_completed(&self, turn_id: &str) {
        self.update(turn_id, |t| {
            t.status = TurnStatus::Completed;
            t.ended_at = Some(Utc::now());
        });
    }

    pub fn mark_failed(&self, turn_id: &str, error_code: &str) {
        self.update(turn_id, |t| {
            t.status = TurnStatus::Failed;
            t.ended_at = Some(Utc::now());
            t.error_code = Some(error_code.to_owned());
        });
    }

    pub fn list_for_session(&self, session_id: &str) -> Vec<Turn> {
        let mut turns: Vec<Turn> = self
            .turns
            .read()
            .values()
            .filter(|t| t.session_id == session_id)
            .cloned()
            .collect();
        turns.sort_by_key(|t| t.created_at);
        turns
    }

    fn update(&self, turn_id: &str, f: impl FnOnce(&mut Turn)) {
        let mut turns = self.turns.write();
        match turns.get_mut(turn_id) {
            Some(turn) => f(turn),
            None => tracing::warn!(turn_id, "update for unknown turn dropped"),
        }
    }
}
