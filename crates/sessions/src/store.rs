//! Orchestrator-owned session store.
//!
//! Sessions live in a concurrent map guarded by a coarse `RwLock` for
//! insert/lookup; every record carries its own mutex so mutations on one
//! session are serialized without blocking the rest of the map. Reads are
//! consistent with the last committed write.
//!
//! The store is the in-memory implementation of the session repository
//! port: nothing in its public surface leaks the backing representation,
//! so a durable backend can replace the internals without touching
//! callers.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::Utc;
use parking_lot::{Mutex, RwLock};

use codial_domain::error::{Error, Result};
use codial_domain::session::{Session, SessionConfig, SessionStatus};

/// Resolves subagent names against the definitions on disk. Implemented
/// over the policy loader by the orchestrator; injected here so the store
/// can gate `set_subagent` without depending on the policy crate.
pub trait SubagentResolver: Send + Sync {
    fn is_known(&self, name: &str) -> bool;
}

struct Slot {
    session: Mutex<Session>,
}

pub struct SessionStore {
    sessions: RwLock<HashMap<String, Arc<Slot>>>,
    enabled_providers: HashSet<String>,
    subagents: Arc<dyn SubagentResolver>,
}

impl SessionStore {
    pub fn new(
        enabled_providers: impl IntoIterator<Item = String>,
        subagents: Arc<dyn SubagentResolver>,
    ) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            enabled_providers: enabled_providers.into_iter().collect(),
            subagents,
        }
    }

    /// Create a new active session with the given seeded config.
    ///
    /// Idempotency on the caller's key is enforced one layer up (the
    /// idempotency index); the store itself always mints a fresh record.
    pub fn create(
        &self,
        guild_id: &str,
        requester_id: &str,
        config: SessionConfig,
    ) -> Session {
        let session = Session::new(guild_id, requester_id, config);
        let slot = Arc::new(Slot {
            session: Mutex::new(session.clone()),
        });
        self.sessions
            .write()
            .insert(session.session_id.clone(), slot);

        tracing::info!(
            session_id = %session.session_id,
            guild_id,
            requester_id,
            "session created"
        );
        session
    }

    pub fn get(&self, session_id: &str) -> Result<Session> {
        let slot = self.slot(session_id)?;
        let session = slot.session.lock();
        Ok(session.clone())
    }

    pub fn list(&self) -> Vec<Session> {
        let slots: Vec<Arc<Slot>> = self.sessions.read().values().cloned().collect();
        slots.iter().map(|s| s.session.lock().clone()).collect()
    }

    pub fn count(&self) -> usize {
        self.sessions.read().len()
    }

    /// Bind the session to its Discord channel.
    pub fn bind_channel(&self, session_id: &str, channel_id: &str) -> Result<Session> {
        self.mutate(session_id, |s| {
            s.channel_id = Some(channel_id.to_owned());
            Ok(())
        })
    }

    /// Transition to `ended`. One-way and idempotent: ending an already
    /// ended session is a no-op success.
    pub fn end(&self, session_id: &str) -> Result<Session> {
        let slot = self.slot(session_id)?;
        let mut session = slot.session.lock();
        if session.status != SessionStatus::Ended {
            session.status = SessionStatus::Ended;
            session.ended_at = Some(Utc::now());
            tracing::info!(session_id, "session ended");
        }
        Ok(session.clone())
    }

    // ── Config mutations ─────────────────────────────────────────────

    pub fn set_provider(&self, session_id: &str, provider: &str) -> Result<Session> {
        if !self.enabled_providers.contains(provider) {
            return Err(Error::ProviderNotEnabled(provider.to_owned()));
        }
        self.mutate(session_id, |s| {
            s.config.provider = provider.to_owned();
            Ok(())
        })
    }

    pub fn set_model(&self, session_id: &str, model: &str) -> Result<Session> {
        self.mutate(session_id, |s| {
            s.config.model = model.to_owned();
            Ok(())
        })
    }

    pub fn set_mcp(
        &self,
        session_id: &str,
        enabled: bool,
        profile_name: &str,
    ) -> Result<Session> {
        self.mutate(session_id, |s| {
            s.config.mcp_enabled = enabled;
            s.config.mcp_profile_name = profile_name.to_owned();
            Ok(())
        })
    }

    /// Set or clear the subagent. A non-null name must resolve to a known
    /// definition on disk.
    pub fn set_subagent(&self, session_id: &str, name: Option<&str>) -> Result<Session> {
        if let Some(name) = name {
            if !self.subagents.is_known(name) {
                return Err(Error::SubagentNotFound(name.to_owned()));
            }
        }
        self.mutate(session_id, |s| {
            s.config.subagent_name = name.map(str::to_owned);
            Ok(())
        })
    }

    // ── Internals ────────────────────────────────────────────────────

    fn slot(&self, session_id: &str) -> Result<Arc<Slot>> {
        self.sessions
            .read()
            .get(session_id)
            .cloned()
            .ok_or_else(|| Error::SessionNotFound(session_id.to_owned()))
    }

    /// Apply a write under the per-session lock, rejecting writes to
    /// ended sessions. The config is unchanged when the closure fails.
    fn mutate(
        &self,
        session_id: &str,
        f: impl FnOnce(&mut Session) -> Result<()>,
    ) -> Result<Session> {
        let slot = self.slot(session_id)?;
        let mut session = slot.session.lock();
        if session.is_ended() {
            return Err(Error::SessionEnded(session_id.to_owned()));
        }
        f(&mut session)?;
        Ok(session.clone())
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedResolver(Vec<&'static str>);

    impl SubagentResolver for FixedResolver {
        fn is_known(&self, name: &str) -> bool {
            self.0.contains(&name)
        }
    }

    fn store() -> SessionStore {
        SessionStore::new(
            ["github-copilot-sdk".to_owned()],
            Arc::new(FixedResolver(vec!["planner"])),
        )
    }

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
    fn create_and_get() {
        let store = store();
        let s = store.create("g1", "u1", config());
        let fetched = store.get(&s.session_id).unwrap();
        assert_eq!(fetched.session_id, s.session_id);
        assert_eq!(store.count(), 1);
    }

    #[test]
    fn get_unknown_session_fails() {
        let err = store().get("nope").unwrap_err();
        assert_eq!(err.wire_code(), "SESSION_NOT_FOUND");
    }

    #[test]
    fn bind_channel_sets_channel_id() {
        let store = store();
        let s = store.create("g1", "u1", config());
        let updated = store.bind_channel(&s.session_id, "chan-9").unwrap();
        assert_eq!(updated.channel_id.as_deref(), Some("chan-9"));
    }

    #[test]
    fn end_is_one_way_and_idempotent() {
        let store = store();
        let s = store.create("g1", "u1", config());

        let ended = store.end(&s.session_id).unwrap();
        assert_eq!(ended.status, SessionStatus::Ended);
        assert!(ended.ended_at.is_some());

        // Second end is a no-op success with the same ended_at.
        let again = store.end(&s.session_id).unwrap();
        assert_eq!(again.status, SessionStatus::Ended);
        assert_eq!(again.ended_at, ended.ended_at);
    }

    #[test]
    fn writes_to_ended_session_fail() {
        let store = store();
        let s = store.create("g1", "u1", config());
        store.end(&s.session_id).unwrap();

        let err = store.set_model(&s.session_id, "other").unwrap_err();
        assert_eq!(err.wire_code(), "SESSION_ENDED");

        // Ended sessions remain addressable for inspection.
        let fetched = store.get(&s.session_id).unwrap();
        assert_eq!(fetched.config.model, "gpt-4o");
    }

    #[test]
    fn set_provider_gated_by_enabled_set() {
        let store = store();
        let s = store.create("g1", "u1", config());

        let err = store.set_provider(&s.session_id, "openai-api").unwrap_err();
        assert_eq!(err.wire_code(), "PROVIDER_NOT_ENABLED");
        // Config unchanged on failure.
        assert_eq!(
            store.get(&s.session_id).unwrap().config.provider,
            "github-copilot-sdk"
        );

        let updated = store
            .set_provider(&s.session_id, "github-copilot-sdk")
            .unwrap();
        assert_eq!(updated.config.provider, "github-copilot-sdk");
    }

    #[test]
    fn set_subagent_requires_known_definition() {
        let store = store();
        let s = store.create("g1", "u1", config());

        let err = store.set_subagent(&s.session_id, Some("ghost")).unwrap_err();
        assert_eq!(err.wire_code(), "SUBAGENT_NOT_FOUND");

        let updated = store.set_subagent(&s.session_id, Some("planner")).unwrap();
        assert_eq!(updated.config.subagent_name.as_deref(), Some("planner"));

        // Null clears the subagent.
        let cleared = store.set_subagent(&s.session_id, None).unwrap();
        assert!(cleared.config.subagent_name.is_none());
    }

    #[test]
    fn set_mcp_updates_both_fields() {
        let store = store();
        let s = store.create("g1", "u1", config());
        let updated = store.set_mcp(&s.session_id, true, "dev").unwrap();
        assert!(updated.config.mcp_enabled);
        assert_eq!(updated.config.mcp_profile_name, "dev");
    }
}
