use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Turn queue + worker pool
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnsConfig {
    /// Number of concurrent turn workers. With 1 worker, turns execute in
    /// global submission order.
    #[serde(default = "d_worker_count")]
    pub worker_count: usize,
    /// Bounded queue capacity; saturation surfaces as `QUEUE_FULL` (503).
    #[serde(default = "d_queue_capacity")]
    pub queue_capacity: usize,
    /// Wall-clock budget for a whole turn (seconds).
    #[serde(default = "d_turn_budget")]
    pub turn_budget_seconds: u64,
    /// How long graceful shutdown waits for in-flight turns before
    /// cancelling them.
    #[serde(default = "d_drain")]
    pub drain_deadline_seconds: u64,
}

impl Default for TurnsConfig {
    fn default() -> Self {
        Self {
            worker_count: d_worker_count(),
            queue_capacity: d_queue_capacity(),
            turn_budget_seconds: d_turn_budget(),
            drain_deadline_seconds: d_drain(),
        }
    }
}

// ── serde default helpers ───────────────────────────────────────────

fn d_worker_count() -> usize {
    2
}
fn d_queue_capacity() -> usize {
    64
}
fn d_turn_budget() -> u64 {
    600
}
fn d_drain() -> u64 {
    20
}
