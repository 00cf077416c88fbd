//! Per-session run locks.
//!
//! A session never executes two turns concurrently: each session id maps
//! to a `Semaphore(1)` and a worker holds the permit for the duration of
//! the turn. Workers for other sessions proceed in parallel.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

pub struct RunLockMap {
    locks: Mutex<HashMap<String, Arc<Semaphore>>>,
}

impl Default for RunLockMap {
    fn default() -> Self {
        Self::new()
    }
}

impl RunLockMap {
    pub fn new() -> Self {
        Self {
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Acquire the run lock for a session, waiting until any in-flight
    /// turn finishes. The permit auto-releases on drop.
    pub async fn acquire(&self, session_id: &str) -> OwnedSemaphorePermit {
        let sem = {
            let mut locks = self.locks.lock();
            locks
                .entry(session_id.to_owned())
                .or_insert_with(|| Arc::new(Semaphore::new(1)))
                .clone()
        };
        sem.acquire_owned()
            .await
            .expect("run-lock semaphore is never closed")
    }

    /// Number of tracked sessions (for monitoring).
    pub fn session_count(&self) -> usize {
        self.locks.lock().len()
    }

    /// Drop lock entries for sessions with no turn in flight.
    pub fn prune_idle(&self) {
        let mut locks = self.locks.lock();
        locks.retain(|_, sem| sem.available_permits() == 0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn sequential_access() {
        let map = RunLockMap::new();

        let permit1 = map.acquire("s1").await;
        drop(permit1);

        let permit2 = map.acquire("s1").await;
        drop(permit2);
    }

    #[tokio::test]
    async fn different_sessions_concurrent() {
        let map = Arc::new(RunLockMap::new());

        let p1 = map.acquire("s1").await;
        let p2 = map.acquire("s2").await;

        // Both held simultaneously.
        assert_eq!(map.session_count(), 2);

        drop(p1);
        drop(p2);
    }

    #[tokio::test]
    async fn same_session_waits() {
        let map = Arc::new(RunLockMap::new());
        let map2 = map.clone();

        let p1 = map.acquire("s1").await;

        let handle = tokio::spawn(async move {
            let _p2 = map2.acquire("s1").await;
            42
        });

        // Give the waiter a moment to queue.
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;

        drop(p1);

        let result = handle.await.unwrap();
        assert_eq!(result, 42);
    }

    #[tokio::test]
    async fn prune_drops_idle_entries() {
        let map = RunLockMap::new();
        {
            let _p = map.acquire("s1").await;
            map.prune_idle();
            // Held lock survives pruning.
            assert_eq!(map.session_count(), 1);
        }
        map.prune_idle();
        assert_eq!(map.session_count(), 0);
    }
}
