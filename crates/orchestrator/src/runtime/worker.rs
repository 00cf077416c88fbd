//! The turn worker pool.
//!
//! A fixed number of workers share the queue receiver. Each worker:
//! dequeue → acquire the session run lock → re-check the session is
//! still active → mark running → run the turn engine under the
//! wall-clock budget → mark completed/failed → drain the event
//! forwarder.
//!
//! Graceful shutdown stops dequeuing, waits out the drain deadline for
//! in-flight turns, cancels stragglers via their tokens, and marks the
//! still-queued remainder failed with `SHUTDOWN`.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use codial_domain::error::Error;
use codial_domain::event::{EventType, ProgressEvent};
use codial_sessions::{RunLockMap, SessionStore, TurnStore};

use super::cancel::CancelMap;
use super::events::{EventPublisher, EVENT_CHANNEL_DEPTH};
use super::queue::QueuedTurn;
use super::turn::TurnEngine;

#[derive(Clone)]
pub struct WorkerContext {
    pub sessions: Arc<SessionStore>,
    pub turns: Arc<TurnStore>,
    pub run_locks: Arc<RunLockMap>,
    pub cancel_map: Arc<CancelMap>,
    pub engine: Arc<TurnEngine>,
    pub publisher: Arc<EventPublisher>,
    pub turn_budget: Duration,
}

pub struct WorkerPool {
    handles: Vec<JoinHandle<()>>,
    stop: CancellationToken,
    rx: Arc<Mutex<mpsc::Receiver<QueuedTurn>>>,
}

impl WorkerPool {
    pub fn spawn(count: usize, rx: mpsc::Receiver<QueuedTurn>, ctx: WorkerContext) -> Self {
        let rx = Arc::new(Mutex::new(rx));
        let stop = CancellationToken::new();

        let handles = (0..count)
            .map(|idx| {
                let rx = rx.clone();
                let ctx = ctx.clone();
                let stop = stop.clone();
                tokio::spawn(async move {
                    worker_loop(idx, rx, ctx, stop).await;
                })
            })
            .collect();

        tracing::info!(workers = count, "turn worker pool ready");
        Self { handles, stop, rx }
    }

    /// Graceful stop. The caller must have closed the queue first so no
    /// new turns are accepted while we drain.
    pub async fn shutdown(mut self, drain_deadline: Duration, cancel_map: &CancelMap, turns: &TurnStore) {
        self.stop.cancel();

        let mut join_all = futures_util::future::join_all(std::mem::take(&mut self.handles));
        if tokio::time::timeout(drain_deadline, &mut join_all).await.is_err() {
            tracing::warn!(
                deadline_secs = drain_deadline.as_secs(),
                "drain deadline expired, cancelling in-flight turns"
            );
            cancel_map.cancel_all();
            let _ = tokio::time::timeout(Duration::from_secs(5), join_all).await;
        }

        // Whatever never reached a worker fails with SHUTDOWN.
        let mut rx = self.rx.lock().await;
        while let Ok(item) = rx.try_recv() {
            turns.mark_failed(&item.turn_id, Error::Shutdown.wire_code());
        }
        tracing::info!("turn worker pool stopped");
    }
}

async fn worker_loop(
    idx: usize,
    rx: Arc<Mutex<mpsc::Receiver<QueuedTurn>>>,
    ctx: WorkerContext,
    stop: CancellationToken,
) {
    tracing::debug!(worker = idx, "worker started");
    loop {
        let item = tokio::select! {
            biased;
            _ = stop.cancelled() => break,
            item = async { rx.lock().await.recv().await } => item,
        };
        let Some(item) = item else { break };
        process_turn(&ctx, item).await;
    }
    tracing::debug!(worker = idx, "worker stopped");
}

async fn process_turn(ctx: &WorkerContext, item: QueuedTurn) {
    // One turn per session at a time; the permit is held for the whole
    // turn.
    let _permit = ctx.run_locks.acquire(&item.session_id).await;

    let session = match ctx.sessions.get(&item.session_id) {
        Ok(session) => session,
        Err(e) => {
            ctx.turns.mark_failed(&item.turn_id, e.wire_code());
            return;
        }
    };
    // The session may have ended while this turn sat in the queue.
    if session.is_ended() {
        let code = Error::SessionEnded(session.session_id.clone()).wire_code();
        ctx.turns.mark_failed(&item.turn_id, code);
        return;
    }
    let turn = match ctx.turns.get(&item.turn_id) {
        Ok(turn) => turn,
        Err(e) => {
            tracing::error!(turn_id = %item.turn_id, error = %e, "queued turn has no record");
            return;
        }
    };

    let cancel = ctx.cancel_map.register(&item.session_id);
    ctx.turns.mark_running(&item.turn_id);
    tracing::info!(
        turn_id = %turn.turn_id,
        session_id = %turn.session_id,
        trace_id = %turn.trace_id,
        "turn started"
    );

    let (tx, rx_events) = mpsc::channel(EVENT_CHANNEL_DEPTH);
    let forwarder = ctx.publisher.spawn_forwarder(rx_events);

    let result = tokio::time::timeout(
        ctx.turn_budget,
        ctx.engine.execute(&turn, &session.config, &cancel, &tx),
    )
    .await;

    match result {
        Ok(Ok(())) => {
            ctx.turns.mark_completed(&turn.turn_id);
            tracing::info!(turn_id = %turn.turn_id, "turn completed");
        }
        Ok(Err(e)) => {
            ctx.turns.mark_failed(&turn.turn_id, e.wire_code());
            tracing::warn!(
                turn_id = %turn.turn_id,
                trace_id = %turn.trace_id,
                error_code = e.wire_code(),
                error = %e,
                "turn failed"
            );
        }
        Err(_elapsed) => {
            let err = Error::TurnTimeout(ctx.turn_budget.as_secs());
            let _ = tx
                .send(ProgressEvent::new(
                    &turn.session_id,
                    &turn.turn_id,
                    EventType::Error,
                    serde_json::json!({
                        "error_code": err.wire_code(),
                        "message": err.to_string(),
                        "trace_id": turn.trace_id,
                        "retryable": err.retryable(),
                    }),
                ))
                .await;
            ctx.turns.mark_failed(&turn.turn_id, err.wire_code());
            tracing::warn!(turn_id = %turn.turn_id, "turn exceeded its wall-clock budget");
        }
    }

    // Close the event channel and wait for the forwarder so every event
    // is on the wire before the run lock releases.
    drop(tx);
    let _ = forwarder.await;
    ctx.cancel_map.remove(&item.session_id);
}
