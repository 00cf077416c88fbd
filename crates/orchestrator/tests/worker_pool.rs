//! Worker-pool behavior: turns never run after their session ends,
//! a single session never executes two turns concurrently, and graceful
//! shutdown fails still-queued turns with `SHUTDOWN`.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use codial_domain::config::GatewayConfig;
use codial_domain::error::Result;
use codial_domain::session::SessionConfig;
use codial_domain::turn::{Turn, TurnStatus};
use codial_orchestrator::runtime::cancel::CancelMap;
use codial_orchestrator::runtime::events::EventPublisher;
use codial_orchestrator::runtime::queue::{QueuedTurn, TurnQueue};
use codial_orchestrator::runtime::turn::TurnEngine;
use codial_orchestrator::runtime::worker::{WorkerContext, WorkerPool};
use codial_policy::PolicyLoader;
use codial_providers::{
    BridgeProvider, BridgeReply, BridgeRequest, ProviderCatalog,
};
use codial_sessions::{RunLockMap, SessionStore, SubagentResolver, TurnStore};

const PROVIDER: &str = "github-copilot-sdk";

struct NoSubagents;

impl SubagentResolver for NoSubagents {
    fn is_known(&self, _name: &str) -> bool {
        false
    }
}

/// Answers after a configurable delay, tracking how many calls for the
/// same provider run concurrently.
struct SlowBridge {
    delay: Duration,
    active: AtomicUsize,
    max_active: AtomicUsize,
}

impl SlowBridge {
    fn new(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            delay,
            active: AtomicUsize::new(0),
            max_active: AtomicUsize::new(0),
        })
    }
}

#[async_trait::async_trait]
impl BridgeProvider for SlowBridge {
    async fn run(&self, req: &BridgeRequest) -> Result<BridgeReply> {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        self.active.fetch_sub(1, Ordering::SeqCst);
        Ok(BridgeReply::terminal(format!("done: {}", req.text)))
    }

    fn name(&self) -> &str {
        PROVIDER
    }
}

struct Fixture {
    sessions: Arc<SessionStore>,
    turns: Arc<TurnStore>,
    cancel_map: Arc<CancelMap>,
    queue: Arc<TurnQueue>,
    pool: WorkerPool,
    _workspace: tempfile::TempDir,
    _home: tempfile::TempDir,
}

fn fixture(workers: usize, bridge: Arc<dyn BridgeProvider>) -> Fixture {
    let workspace = tempfile::tempdir().unwrap();
    let home = tempfile::tempdir().unwrap();
    let policy = Arc::new(PolicyLoader::new(workspace.path()).with_home(home.path()));
    let providers = Arc::new(ProviderCatalog::from_parts(vec![bridge]));
    let engine = Arc::new(TurnEngine::new(policy, providers, None, None));

    let sessions = Arc::new(SessionStore::new(
        [PROVIDER.to_owned()],
        Arc::new(NoSubagents),
    ));
    let turns = Arc::new(TurnStore::new());
    let cancel_map = Arc::new(CancelMap::new());
    let publisher = Arc::new(EventPublisher::new(
        &GatewayConfig::default(),
        Duration::from_secs(5),
    ));

    let (queue, rx) = TurnQueue::new(16);
    let pool = WorkerPool::spawn(
        workers,
        rx,
        WorkerContext {
            sessions: sessions.clone(),
            turns: turns.clone(),
            run_locks: Arc::new(RunLockMap::new()),
            cancel_map: cancel_map.clone(),
            engine,
            publisher,
            turn_budget: Duration::from_secs(30),
        },
    );

    Fixture {
        sessions,
        turns,
        cancel_map,
        queue: Arc::new(queue),
        pool,
        _workspace: workspace,
        _home: home,
    }
}

fn session_config() -> SessionConfig {
    SessionConfig {
        provider: PROVIDER.into(),
        model: "gpt-4o".into(),
        mcp_enabled: false,
        mcp_profile_name: "default".into(),
        subagent_name: None,
    }
}

fn submit(f: &Fixture, session_id: &str, text: &str) -> String {
    let turn = Turn::new(session_id, "u1", "c1", text, Vec::new(), text);
    let turn_id = turn.turn_id.clone();
    f.turns.insert(turn);
    f.queue
        .submit(QueuedTurn {
            turn_id: turn_id.clone(),
            session_id: session_id.to_owned(),
        })
        .unwrap();
    turn_id
}

async fn wait_terminal(turns: &TurnStore, turn_id: &str) -> TurnStatus {
    for _ in 0..200 {
        let turn = turns.get(turn_id).unwrap();
        if turn.status.is_terminal() {
            return turn.status;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("turn {turn_id} never reached a terminal status");
}

#[tokio::test]
async fn turn_completes_through_the_pool() {
    let f = fixture(2, SlowBridge::new(Duration::from_millis(10)));
    let session = f.sessions.create("g1", "u1", session_config());

    let turn_id = submit(&f, &session.session_id, "hello");
    let status = wait_terminal(&f.turns, &turn_id).await;
    assert_eq!(status, TurnStatus::Completed);
}

#[tokio::test]
async fn queued_turn_fails_when_session_ended_first() {
    let slow = SlowBridge::new(Duration::from_millis(200));
    let f = fixture(1, slow);
    let busy = f.sessions.create("g1", "u1", session_config());
    let doomed = f.sessions.create("g1", "u2", session_config());

    // Occupy the single worker, then queue a turn for the session we end.
    let busy_turn = submit(&f, &busy.session_id, "occupy");
    let doomed_turn = submit(&f, &doomed.session_id, "too late");
    f.sessions.end(&doomed.session_id).unwrap();

    let status = wait_terminal(&f.turns, &doomed_turn).await;
    assert_eq!(status, TurnStatus::Failed);
    assert_eq!(
        f.turns.get(&doomed_turn).unwrap().error_code.as_deref(),
        Some("SESSION_ENDED")
    );
    // The occupying turn still completes normally.
    assert_eq!(wait_terminal(&f.turns, &busy_turn).await, TurnStatus::Completed);
}

#[tokio::test]
async fn one_session_never_runs_two_turns_concurrently() {
    let bridge = SlowBridge::new(Duration::from_millis(50));
    let f = fixture(2, bridge.clone());
    let session = f.sessions.create("g1", "u1", session_config());

    let t1 = submit(&f, &session.session_id, "first");
    let t2 = submit(&f, &session.session_id, "second");

    assert_eq!(wait_terminal(&f.turns, &t1).await, TurnStatus::Completed);
    assert_eq!(wait_terminal(&f.turns, &t2).await, TurnStatus::Completed);

    // Two workers were available, but the per-session run lock kept the
    // bridge serialized.
    assert_eq!(bridge.max_active.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn shutdown_fails_queued_turns_with_shutdown() {
    let f = fixture(1, SlowBridge::new(Duration::from_millis(200)));
    let session = f.sessions.create("g1", "u1", session_config());

    let running = submit(&f, &session.session_id, "in flight");
    // Give the worker a moment to pick up the first turn.
    tokio::time::sleep(Duration::from_millis(50)).await;
    let queued = submit(&f, &session.session_id, "never starts");

    f.queue.close();
    assert!(f.queue.submit(QueuedTurn {
        turn_id: "late".into(),
        session_id: session.session_id.clone(),
    })
    .is_err());

    f.pool
        .shutdown(Duration::from_secs(2), &f.cancel_map, &f.turns)
        .await;

    assert_eq!(
        f.turns.get(&running).unwrap().status,
        TurnStatus::Completed,
        "in-flight turn drains within the deadline"
    );
    assert_eq!(f.turns.get(&queued).unwrap().status, TurnStatus::Failed);
    assert_eq!(
        f.turns.get(&queued).unwrap().error_code.as_deref(),
        Some("SHUTDOWN")
    );
}
