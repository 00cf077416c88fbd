//! Bounded turn queue.
//!
//! Accepted turns enter a bounded FIFO; workers dequeue on the other
//! side. Enqueue never blocks: saturation surfaces to the caller as
//! `QUEUE_FULL` (HTTP 503), and a closed queue (graceful shutdown)
//! surfaces as `SHUTDOWN`.

use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::mpsc;

use codial_domain::error::{Error, Result};

/// A queued reference to a turn; the record itself lives in the turn
/// store.
#[derive(Debug, Clone)]
pub struct QueuedTurn {
    pub turn_id: String,
    pub session_id: String,
}

pub struct TurnQueue {
    tx: mpsc::Sender<QueuedTurn>,
    closed: AtomicBool,
}

impl TurnQueue {
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<QueuedTurn>) {
        let (tx, rx) = mpsc::channel(capacity);
        (
            Self {
                tx,
                closed: AtomicBool::new(false),
            },
            rx,
        )
    }

    /// Non-blocking enqueue.
    pub fn submit(&self, turn: QueuedTurn) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(Error::Shutdown);
        }
        self.tx.try_send(turn).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => Error::QueueFull,
            mpsc::error::TrySendError::Closed(_) => Error::Shutdown,
        })
    }

    /// Stop accepting new enqueues (graceful shutdown).
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn turn(n: usize) -> QueuedTurn {
        QueuedTurn {
            turn_id: format!("t{n}"),
            session_id: "s1".into(),
        }
    }

    #[tokio::test]
    async fn saturation_surfaces_queue_full() {
        let (queue, mut rx) = TurnQueue::new(2);
        queue.submit(turn(1)).unwrap();
        queue.submit(turn(2)).unwrap();

        let err = queue.submit(turn(3)).unwrap_err();
        assert_eq!(err.wire_code(), "QUEUE_FULL");

        // Draining one slot makes room again.
        rx.recv().await.unwrap();
        queue.submit(turn(3)).unwrap();
    }

    #[tokio::test]
    async fn fifo_order_is_preserved() {
        let (queue, mut rx) = TurnQueue::new(4);
        for n in 1..=3 {
            queue.submit(turn(n)).unwrap();
        }
        assert_eq!(rx.recv().await.unwrap().turn_id, "t1");
        assert_eq!(rx.recv().await.unwrap().turn_id, "t2");
        assert_eq!(rx.recv().await.unwrap().turn_id, "t3");
    }

    #[tokio::test]
    async fn closed_queue_rejects_with_shutdown() {
        let (queue, _rx) = TurnQueue::new(2);
        queue.close();
        let err = queue.submit(turn(1)).unwrap_err();
        assert_eq!(err.wire_code(), "SHUTDOWN");
    }
}
