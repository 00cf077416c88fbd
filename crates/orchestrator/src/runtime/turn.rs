//! Turn execution — the inner orchestrator that composes policy, calls
//! the provider bridge, dispatches MCP tool calls, and emits progress
//! events.
//!
//! The tool loop is bounded to [`MAX_ROUNDS`]; a turn that keeps
//! requesting tools past the budget emits a terminal `final` event and
//! fails with `TOOL_BUDGET_EXCEEDED`. The cancellation token is checked
//! at every suspension point; on observe the engine emits
//! `error{CANCELLED}` and unwinds.

use std::sync::Arc;

use tokio::sync::mpsc;

use codial_domain::error::{Error, Result};
use codial_domain::event::{EventType, ProgressEvent};
use codial_domain::session::SessionConfig;
use codial_domain::turn::{Attachment, Turn};
use codial_policy::PolicyLoader;
use codial_providers::{
    BridgeOutcome, BridgeRequest, ProviderCatalog, ToolManifestEntry, ToolRequest, ToolResultEntry,
};

use super::attachments::AttachmentIngestor;
use super::cancel::CancelToken;
use super::tools::ToolBackend;

/// Maximum bridge rounds per turn.
pub const MAX_ROUNDS: usize = 5;

pub struct TurnEngine {
    policy: Arc<PolicyLoader>,
    providers: Arc<ProviderCatalog>,
    tools: Option<Arc<dyn ToolBackend>>,
    ingestor: Option<Arc<AttachmentIngestor>>,
}

impl TurnEngine {
    pub fn new(
        policy: Arc<PolicyLoader>,
        providers: Arc<ProviderCatalog>,
        tools: Option<Arc<dyn ToolBackend>>,
        ingestor: Option<Arc<AttachmentIngestor>>,
    ) -> Self {
        Self {
            policy,
            providers,
            tools,
            ingestor,
        }
    }

    /// Run one turn to completion, emitting events on `tx`.
    ///
    /// On failure the terminal event has already been emitted when this
    /// returns: `final` for budget exhaustion, `error` for everything
    /// else.
    pub async fn execute(
        &self,
        turn: &Turn,
        config: &SessionConfig,
        cancel: &CancelToken,
        tx: &mpsc::Sender<ProgressEvent>,
    ) -> Result<()> {
        match self.execute_inner(turn, config, cancel, tx).await {
            Ok(()) => Ok(()),
            // The budget path emits its own `final` event.
            Err(e @ Error::ToolBudgetExceeded(_)) => Err(e),
            Err(e) => {
                emit(
                    tx,
                    turn,
                    EventType::Error,
                    serde_json::json!({
                        "error_code": e.wire_code(),
                        "message": e.to_string(),
                        "trace_id": turn.trace_id,
                        "retryable": e.retryable(),
                    }),
                )
                .await;
                Err(e)
            }
        }
    }

    async fn execute_inner(
        &self,
        turn: &Turn,
        config: &SessionConfig,
        cancel: &CancelToken,
        tx: &mpsc::Sender<ProgressEvent>,
    ) -> Result<()> {
        check_cancel(cancel)?;

        // ── Policy composition ───────────────────────────────────────
        let snapshot = self.policy.load()?;
        let subagent = match &config.subagent_name {
            Some(name) => Some(
                snapshot
                    .subagent(name)
                    .ok_or_else(|| Error::SubagentNotFound(name.clone()))?,
            ),
            None => None,
        };
        let system_context = snapshot.system_context(subagent);
        let model = subagent
            .and_then(|s| s.model.clone())
            .unwrap_or_else(|| config.model.clone());

        tracing::debug!(
            turn_id = %turn.turn_id,
            policy_hash = %snapshot.content_hash,
            subagent = config.subagent_name.as_deref().unwrap_or("-"),
            "turn context composed"
        );

        // ── Attachment handling ──────────────────────────────────────
        let attachments: Vec<Attachment> = match &self.ingestor {
            Some(ingestor) => ingestor.ingest(&turn.attachments).await?,
            None => turn.attachments.clone(),
        };

        // ── MCP tool discovery ───────────────────────────────────────
        let tool_backend = if config.mcp_enabled {
            self.tools.as_ref()
        } else {
            None
        };
        let tool_manifest: Vec<ToolManifestEntry> = match tool_backend {
            Some(tools) => tools.manifest().await?,
            None => Vec::new(),
        };

        let provider = self.providers.resolve(&config.provider)?;

        // ── Tool loop ────────────────────────────────────────────────
        let mut tool_results: Vec<ToolResultEntry> = Vec::new();
        let mut plan_emitted = false;

        for round in 1..=MAX_ROUNDS {
            check_cancel(cancel)?;

            let req = BridgeRequest {
                system_context: system_context.clone(),
                text: turn.text.clone(),
                attachments: attachments.clone(),
                tool_manifest: tool_manifest.clone(),
                tool_results: tool_results.clone(),
                model: model.clone(),
                // Round-scoped key: replaying the same round under a
                // transport retry is side-effect free on the bridge.
                idempotency_key: format!("{}:{round}", turn.turn_id),
            };

            tracing::debug!(turn_id = %turn.turn_id, round, "calling provider bridge");
            let reply = provider.run(&req).await?;
            check_cancel(cancel)?;

            if let Some(plan) = &reply.plan {
                if !plan_emitted {
                    emit(
                        tx,
                        turn,
                        EventType::Plan,
                        serde_json::json!({ "text": plan }),
                    )
                    .await;
                    plan_emitted = true;
                }
            }
            for delta in &reply.deltas {
                emit(
                    tx,
                    turn,
                    EventType::ResponseDelta,
                    serde_json::json!({ "text": delta }),
                )
                .await;
            }

            match reply.outcome {
                BridgeOutcome::Final { text } => {
                    emit(tx, turn, EventType::Final, serde_json::json!({ "text": text })).await;
                    return Ok(());
                }
                BridgeOutcome::ToolRequests(requests) => {
                    let round_results = self
                        .dispatch_tools(turn, tool_backend, &requests, cancel, tx)
                        .await?;

                    let summary = round_results
                        .iter()
                        .zip(&requests)
                        .map(|(r, req)| {
                            format!("{} {}", req.name, if r.ok { "ok" } else { "error" })
                        })
                        .collect::<Vec<_>>()
                        .join("; ");
                    emit(
                        tx,
                        turn,
                        EventType::DecisionSummary,
                        serde_json::json!({
                            "text": format!("round {round}: {summary}"),
                            "round": round,
                        }),
                    )
                    .await;

                    tool_results.extend(round_results);
                }
            }
        }

        // ── Budget exhausted ─────────────────────────────────────────
        let err = Error::ToolBudgetExceeded(MAX_ROUNDS);
        emit(
            tx,
            turn,
            EventType::Final,
            serde_json::json!({
                "text": format!(
                    "Stopping: the tool budget of {MAX_ROUNDS} rounds was exhausted \
                     without a final answer."
                ),
                "error_code": err.wire_code(),
            }),
        )
        .await;
        Err(err)
    }

    /// Invoke one round's tool requests in order. Tool failures of any
    /// kind become error entries for the next bridge round — a tool call
    /// is never retried at the call site.
    async fn dispatch_tools(
        &self,
        turn: &Turn,
        backend: Option<&Arc<dyn ToolBackend>>,
        requests: &[ToolRequest],
        cancel: &CancelToken,
        tx: &mpsc::Sender<ProgressEvent>,
    ) -> Result<Vec<ToolResultEntry>> {
        let mut results = Vec::with_capacity(requests.len());

        for request in requests {
            check_cancel(cancel)?;

            emit(
                tx,
                turn,
                EventType::Action,
                serde_json::json!({
                    "tool_call_id": request.tool_call_id,
                    "tool": request.name,
                    "arguments": request.arguments,
                }),
            )
            .await;

            let entry = match backend {
                Some(tools) => {
                    match tools.call(&request.name, request.arguments.clone()).await {
                        Ok(out) if !out.is_error => {
                            ToolResultEntry::success(&request.tool_call_id, out.text)
                        }
                        Ok(out) => ToolResultEntry::failure(&request.tool_call_id, out.text),
                        Err(e) => {
                            tracing::warn!(
                                turn_id = %turn.turn_id,
                                tool = %request.name,
                                error = %e,
                                "tool call failed"
                            );
                            ToolResultEntry::failure(&request.tool_call_id, e.to_string())
                        }
                    }
                }
                None => ToolResultEntry::failure(
                    &request.tool_call_id,
                    "no tool backend is available in this session",
                ),
            };
            results.push(entry);
        }

        Ok(results)
    }
}

fn check_cancel(cancel: &CancelToken) -> Result<()> {
    if cancel.is_cancelled() {
        Err(Error::Cancelled)
    } else {
        Ok(())
    }
}

async fn emit(
    tx: &mpsc::Sender<ProgressEvent>,
    turn: &Turn,
    event_type: EventType,
    payload: serde_json::Value,
) {
    let event = ProgressEvent::new(&turn.session_id, &turn.turn_id, event_type, payload);
    // A dropped receiver means the turn is being torn down; nothing
    // useful to do with the event.
    let _ = tx.send(event).await;
}
