//! Per-session cancellation tokens.
//!
//! Each running turn gets a `CancelToken` registered under its session
//! id. Ending the session (or a graceful shutdown) cancels the token;
//! the turn engine checks it at every suspension point and unwinds with
//! `CANCELLED`.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

/// A cancellation token checked cooperatively by the turn engine.
#[derive(Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

/// Tracks the active cancel token per session id.
#[derive(Default)]
pub struct CancelMap {
    tokens: Mutex<HashMap<String, CancelToken>>,
}

impl CancelMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create and register a token for a session's in-flight turn.
    pub fn register(&self, session_id: &str) -> CancelToken {
        let token = CancelToken::new();
        self.tokens
            .lock()
            .insert(session_id.to_owned(), token.clone());
        token
    }

    /// Cancel the in-flight turn of a session, if any. Returns whether a
    /// token was found.
    pub fn cancel(&self, session_id: &str) -> bool {
        match self.tokens.lock().get(session_id) {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Cancel every in-flight turn (graceful shutdown).
    pub fn cancel_all(&self) {
        for token in self.tokens.lock().values() {
            token.cancel();
        }
    }

    /// Remove the token once the turn completes.
    pub fn remove(&self, session_id: &str) {
        self.tokens.lock().remove(session_id);
    }

    pub fn is_running(&self, session_id: &str) -> bool {
        self.tokens.lock().contains_key(session_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancel_token_lifecycle() {
        let token = CancelToken::new();
        assert!(!token.is_cancelled());
        token.cancel();
        assert!(token.is_cancelled());
    }

    #[test]
    fn cancel_token_clone_shares_state() {
        let token = CancelToken::new();
        let clone = token.clone();
        token.cancel();
        assert!(clone.is_cancelled());
    }

    #[test]
    fn register_and_cancel() {
        let map = CancelMap::new();
        let token = map.register("s1");
        assert!(map.is_running("s1"));

        assert!(map.cancel("s1"));
        assert!(token.is_cancelled());

        map.remove("s1");
        assert!(!map.is_running("s1"));
        assert!(!map.cancel("s1"));
    }

    #[test]
    fn cancel_all_hits_every_session() {
        let map = CancelMap::new();
        let t1 = map.register("s1");
        let t2 = map.register("s2");
        map.cancel_all();
        assert!(t1.is_cancelled());
        assert!(t2.is_cancelled());
    }

    #[test]
    fn cancel_nonexistent_session_returns_false() {
        let map = CancelMap::new();
        assert!(!map.cancel("ghost"));
    }
}
