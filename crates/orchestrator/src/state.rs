//! Shared application state passed to all API handlers.

use std::sync::Arc;

use codial_domain::config::Config;
use codial_policy::{PolicyLoader, RulesStore};
use codial_providers::ProviderCatalog;
use codial_sessions::{RunLockMap, SessionStore, TurnStore};

use crate::runtime::cancel::CancelMap;
use crate::runtime::idempotency::IdempotencyIndex;
use crate::runtime::queue::TurnQueue;

/// Everything a request handler can reach. Constructed once in
/// `bootstrap::build_app_state` and torn down in graceful shutdown; no
/// hidden singletons.
#[derive(Clone)]
pub struct AppState {
    // ── Core services ─────────────────────────────────────────────────
    pub config: Arc<Config>,
    pub policy: Arc<PolicyLoader>,
    pub rules: Arc<RulesStore>,
    pub providers: Arc<ProviderCatalog>,

    // ── Session & turn state ──────────────────────────────────────────
    pub sessions: Arc<SessionStore>,
    pub turns: Arc<TurnStore>,
    pub run_locks: Arc<RunLockMap>,
    pub cancel_map: Arc<CancelMap>,

    // ── Intake ────────────────────────────────────────────────────────
    pub queue: Arc<TurnQueue>,
    pub idempotency: Arc<IdempotencyIndex>,

    // ── Security (startup-computed) ───────────────────────────────────
    /// SHA-256 hash of the API bearer token (read once at startup).
    /// `None` = dev mode (no auth enforced).
    pub api_token_hash: Option<Vec<u8>>,
}
