//! Idempotency index for session creation and turn submission.
//!
//! Keys are `(scope, key)`; the value is the response envelope returned
//! on the first success, replayed verbatim within the TTL. Failures are
//! never cached. Racing duplicates are serialized per key: the loser
//! waits for the winner and then observes its stored response.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::Semaphore;

use codial_domain::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    SessionCreate,
    TurnSubmit,
}

struct Entry {
    response: Value,
    stored_at: Instant,
}

/// Lazy-eviction threshold: sweep expired entries once the map grows
/// past this size.
const SWEEP_THRESHOLD: usize = 10_000;

pub struct IdempotencyIndex {
    entries: Mutex<HashMap<(Scope, String), Entry>>,
    gates: Mutex<HashMap<(Scope, String), Arc<Semaphore>>>,
    ttl: Duration,
}

impl IdempotencyIndex {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            gates: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    /// Run `op` at most once per `(scope, key)` within the TTL.
    ///
    /// A repeat within the TTL returns the stored response without side
    /// effects; concurrent duplicates queue on the per-key gate.
    pub async fn execute<F>(&self, scope: Scope, key: &str, op: F) -> Result<Value>
    where
        F: std::future::Future<Output = Result<Value>>,
    {
        let gate = {
            let mut gates = self.gates.lock();
            gates
                .entry((scope, key.to_owned()))
                .or_insert_with(|| Arc::new(Semaphore::new(1)))
                .clone()
        };
        let _permit = gate
            .acquire()
            .await
            .expect("idempotency gate is never closed");

        if let Some(stored) = self.lookup(scope, key) {
            tracing::debug!(?scope, key, "idempotent replay");
            return Ok(stored);
        }

        let result = op.await;
        if let Ok(response) = &result {
            self.store(scope, key, response.clone());
        }
        result
    }

    fn lookup(&self, scope: Scope, key: &str) -> Option<Value> {
        let entries = self.entries.lock();
        let entry = entries.get(&(scope, key.to_owned()))?;
        if entry.stored_at.elapsed() < self.ttl {
            Some(entry.response.clone())
        } else {
            None
        }
    }

    fn store(&self, scope: Scope, key: &str, response: Value) {
        let mut entries = self.entries.lock();
        if entries.len() > SWEEP_THRESHOLD {
            let ttl = self.ttl;
            entries.retain(|_, e| e.stored_at.elapsed() < ttl);
            let live: std::collections::HashSet<_> = entries.keys().cloned().collect();
            self.gates.lock().retain(|k, _| live.contains(k));
        }
        entries.insert(
            (scope, key.to_owned()),
            Entry {
                response,
                stored_at: Instant::now(),
            },
        );
    }
}
