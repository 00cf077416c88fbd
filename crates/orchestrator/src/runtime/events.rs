//! Progress-event delivery to the Discord gateway.
//!
//! Each turn gets its own bounded channel plus one forwarder task that
//! POSTs events sequentially to `{gateway}/internal/stream-events`, so
//! on-the-wire order matches emission order per `(session_id, turn_id)`.
//! No event is dropped: if the gateway is slow the channel fills and the
//! engine blocks on send, inside the turn's own wall-clock budget.
//!
//! Delivery retries transport errors and 5xx with exponential back-off;
//! 4xx is terminal and logged.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use codial_domain::config::GatewayConfig;
use codial_domain::event::ProgressEvent;

/// Retry attempts after the initial delivery of one event.
const MAX_RETRIES: u32 = 3;

/// Per-turn channel depth before the engine blocks on emit.
pub const EVENT_CHANNEL_DEPTH: usize = 64;

pub struct EventPublisher {
    http: reqwest::Client,
    url: String,
    token: String,
    /// With no gateway configured, events are logged and discarded.
    enabled: bool,
}

impl EventPublisher {
    pub fn new(config: &GatewayConfig, request_timeout: Duration) -> Self {
        let enabled = !config.base_url.is_empty();
        if !enabled {
            tracing::warn!("no gateway configured — progress events will be logged only");
        }
        Self {
            http: reqwest::Client::builder()
                .timeout(request_timeout)
                .build()
                .unwrap_or_default(),
            url: config.stream_events_url(),
            token: config.internal_token.clone(),
            enabled,
        }
    }

    /// Spawn the per-turn forwarder. The handle completes once the
    /// sender side is dropped and every buffered event is delivered.
    pub fn spawn_forwarder(
        self: &std::sync::Arc<Self>,
        mut rx: mpsc::Receiver<ProgressEvent>,
    ) -> JoinHandle<()> {
        let publisher = self.clone();
        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                publisher.deliver(&event).await;
            }
        })
    }

    /// Deliver one event, retrying transient failures.
    async fn deliver(&self, event: &ProgressEvent) {
        if !self.enabled {
            tracing::debug!(
                session_id = %event.session_id,
                turn_id = %event.turn_id,
                event_type = ?event.event_type,
                "gateway disabled, dropping event"
            );
            return;
        }

        for attempt in 0..=MAX_RETRIES {
            if attempt > 0 {
                tokio::time::sleep(Duration::from_millis(100 * 2u64.pow(attempt - 1))).await;
            }

            let result = self
                .http
                .post(&self.url)
                .header("x-internal-token", &self.token)
                .json(event)
                .send()
                .await;

            match result {
                Ok(resp) if resp.status().is_success() => return,
                Ok(resp) if resp.status().is_client_error() => {
                    // 4xx is terminal: the gateway rejected the event.
                    tracing::error!(
                        status = %resp.status(),
                        session_id = %event.session_id,
                        turn_id = %event.turn_id,
                        "gateway rejected progress event"
                    );
                    return;
                }
                Ok(resp) => {
                    tracing::warn!(
                        status = %resp.status(),
                        attempt,
                        "gateway returned server error, retrying"
                    );
                }
                Err(e) => {
                    tracing::warn!(error = %e, attempt, "event delivery failed, retrying");
                }
            }
        }

        tracing::error!(
            session_id = %event.session_id,
            turn_id = %event.turn_id,
            "progress event undeliverable after {MAX_RETRIES} retries"
        );
    }
}
