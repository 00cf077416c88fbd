//! AppState construction and worker-pool spawning.
//!
//! Every process-wide subsystem is constructed here, explicitly, and
//! handed to the server through [`crate::state::AppState`]; graceful
//! shutdown tears the worker pool down through the handle returned
//! alongside it.

use std::sync::Arc;
use std::time::Duration;

use sha2::{Digest, Sha256};

use codial_domain::config::Config;
use codial_mcp_client::McpClient;
use codial_policy::{PolicyLoader, RulesStore};
use codial_providers::ProviderCatalog;
use codial_sessions::{RunLockMap, SessionStore, SubagentResolver, TurnStore};

use crate::runtime::attachments::AttachmentIngestor;
use crate::runtime::cancel::CancelMap;
use crate::runtime::events::EventPublisher;
use crate::runtime::idempotency::IdempotencyIndex;
use crate::runtime::queue::TurnQueue;
use crate::runtime::tools::{McpToolBackend, ToolBackend};
use crate::runtime::turn::TurnEngine;
use crate::runtime::worker::{WorkerContext, WorkerPool};
use crate::state::AppState;

/// How long idempotency keys replay their first response.
const IDEMPOTENCY_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Resolves subagent names by consulting the policy loader, so the
/// session store can gate `set_subagent` against the definitions
/// currently on disk.
struct PolicySubagents {
    policy: Arc<PolicyLoader>,
}

impl SubagentResolver for PolicySubagents {
    fn is_known(&self, name: &str) -> bool {
        self.policy
            .load()
            .map(|snapshot| snapshot.has_subagent(name))
            .unwrap_or(false)
    }
}

/// Initialize every subsystem and return a fully-wired [`AppState`] plus
/// the running worker pool.
pub async fn build_app_state(config: Arc<Config>) -> anyhow::Result<(AppState, WorkerPool)> {
    let request_timeout = Duration::from_secs(config.server.request_timeout_seconds);

    // ── Policy loader + rules store ──────────────────────────────────
    let policy = Arc::new(PolicyLoader::new(&config.workspace_root));
    let rules = Arc::new(RulesStore::new(&config.workspace_root));
    tracing::info!(root = %config.workspace_root.display(), "policy loader ready");

    // ── Provider catalog ─────────────────────────────────────────────
    let providers = Arc::new(ProviderCatalog::from_config(&config.providers).await);
    if providers.is_empty() {
        tracing::warn!(
            "no provider bridges initialized — turns will fail until a provider is reachable"
        );
    } else {
        tracing::info!(providers = providers.len(), "provider catalog ready");
    }

    // ── Session + turn state ─────────────────────────────────────────
    let sessions = Arc::new(SessionStore::new(
        config.providers.enabled.iter().cloned(),
        Arc::new(PolicySubagents {
            policy: policy.clone(),
        }),
    ));
    let turns = Arc::new(TurnStore::new());
    let run_locks = Arc::new(RunLockMap::new());
    let cancel_map = Arc::new(CancelMap::new());
    tracing::info!("session store ready");

    // ── MCP client ───────────────────────────────────────────────────
    let tools: Option<Arc<dyn ToolBackend>> = match McpClient::connect(&config.mcp).await {
        Ok(Some(client)) => Some(Arc::new(McpToolBackend::new(Arc::new(client)))),
        Ok(None) => None,
        Err(e) => {
            tracing::warn!(error = %e, "MCP server unreachable, continuing without tools");
            None
        }
    };

    // ── Attachment ingest ────────────────────────────────────────────
    let ingestor =
        AttachmentIngestor::from_config(&config.attachments, request_timeout).map(Arc::new);
    if ingestor.is_some() {
        tracing::info!(
            dir = %config.attachments.storage_dir.display(),
            max_bytes = config.attachments.download_max_bytes,
            "attachment ingest enabled"
        );
    }

    // ── Event publisher + turn engine ────────────────────────────────
    let publisher = Arc::new(EventPublisher::new(&config.gateway, request_timeout));
    let engine = Arc::new(TurnEngine::new(
        policy.clone(),
        providers.clone(),
        tools,
        ingestor,
    ));

    // ── Turn queue + worker pool ─────────────────────────────────────
    let (queue, queue_rx) = TurnQueue::new(config.turns.queue_capacity);
    let queue = Arc::new(queue);
    let pool = WorkerPool::spawn(
        config.turns.worker_count,
        queue_rx,
        WorkerContext {
            sessions: sessions.clone(),
            turns: turns.clone(),
            run_locks: run_locks.clone(),
            cancel_map: cancel_map.clone(),
            engine,
            publisher,
            turn_budget: Duration::from_secs(config.turns.turn_budget_seconds),
        },
    );

    // ── Idempotency index ────────────────────────────────────────────
    let idempotency = Arc::new(IdempotencyIndex::new(IDEMPOTENCY_TTL));
    tracing::info!("idempotency index ready (24h TTL)");

    // ── API token (read once, hash for constant-time comparison) ─────
    let api_token_hash = match config.server.api_token.as_deref().filter(|t| !t.is_empty()) {
        Some(token) => {
            tracing::info!("API bearer-token auth enabled");
            Some(Sha256::digest(token.as_bytes()).to_vec())
        }
        None => {
            tracing::warn!("API bearer-token auth DISABLED — set CORE_API_TOKEN");
            None
        }
    };

    let state = AppState {
        config,
        policy,
        rules,
        providers,
        sessions,
        turns,
        run_locks,
        cancel_map,
        queue,
        idempotency,
        api_token_hash,
    };

    Ok((state, pool))
}

/// Spawn the long-running janitor tasks. Call this **after**
/// [`build_app_state`] when running the server.
pub fn spawn_background_tasks(state: &AppState) {
    // ── Periodic run-lock pruning ────────────────────────────────────
    {
        let run_locks = state.run_locks.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(60));
            loop {
                interval.tick().await;
                run_locks.prune_idle();
            }
        });
    }
    tracing::info!("background tasks spawned");
}
