//! Shared HTTP client for provider bridges.
//!
//! Wraps a `reqwest::Client` with automatic retry + exponential back-off
//! (plus jitter) on transient failures: 5xx, 429, timeouts, and transport
//! errors. Other 4xx are permanent. The caller supplies an idempotency
//! key per logical round, so replays of the same request are safe.

use std::time::Duration;

use rand::Rng;
use serde_json::Value;

use codial_domain::error::{Error, Result};

use crate::traits::{BridgeOutcome, BridgeReply, BridgeRequest, ToolRequest};

/// Default retry attempts after the initial call.
const DEFAULT_MAX_RETRIES: u32 = 2;

#[derive(Debug, Clone)]
pub struct BridgeClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
    max_retries: u32,
}

impl BridgeClient {
    pub fn new(base_url: &str, token: Option<String>, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::BridgeTransport(e.to_string()))?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_owned(),
            token,
            max_retries: DEFAULT_MAX_RETRIES,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// POST a JSON body and decode the JSON reply, with retry on
    /// transient failures.
    pub async fn post_json(&self, path: &str, body: &Value) -> Result<Value> {
        let url = self.url(path);
        let mut last_err: Option<Error> = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let base = 100 * 2u64.pow(attempt - 1);
                let jitter = rand::thread_rng().gen_range(0..=base / 2);
                tokio::time::sleep(Duration::from_millis(base + jitter)).await;
            }

            let mut rb = self.http.post(&url).json(body);
            if let Some(token) = &self.token {
                rb = rb.bearer_auth(token);
            }

            match rb.send().await {
                Ok(resp) => {
                    let status = resp.status();

                    if status.as_u16() == 429 {
                        last_err = Some(Error::RateLimited(format!("{url} returned 429")));
                        continue;
                    }
                    if status.is_server_error() {
                        let text = resp.text().await.unwrap_or_default();
                        last_err = Some(Error::BridgeTransport(format!(
                            "{url} returned {status}: {text}"
                        )));
                        continue;
                    }
                    if status == reqwest::StatusCode::UNAUTHORIZED
                        || status == reqwest::StatusCode::FORBIDDEN
                    {
                        let text = resp.text().await.unwrap_or_default();
                        return Err(Error::ProviderAuth(format!(
                            "{url} rejected credentials ({status}): {text}"
                        )));
                    }
                    if status.is_client_error() {
                        let text = resp.text().await.unwrap_or_default();
                        return Err(Error::BridgeProtocol(format!(
                            "{url} returned {status}: {text}"
                        )));
                    }

                    return resp
                        .json::<Value>()
                        .await
                        .map_err(|e| Error::BridgeProtocol(format!("decoding {url}: {e}")));
                }
                Err(e) if e.is_timeout() => {
                    last_err = Some(Error::BridgeTimeout(url.clone()));
                    continue;
                }
                Err(e) => {
                    last_err = Some(Error::BridgeTransport(e.to_string()));
                    continue;
                }
            }
        }

        Err(last_err.unwrap_or_else(|| Error::BridgeTransport(format!("{url}: retries exhausted"))))
    }

    /// Run one bridge round against the conventional `/v1/run` endpoint.
    pub async fn run_round(&self, req: &BridgeRequest) -> Result<BridgeReply> {
        let body = serde_json::to_value(req)?;
        let reply = self.post_json("/v1/run", &body).await?;
        parse_reply(reply)
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Reply decoding
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Decode a bridge reply body. A non-empty `tool_requests` array wins;
/// otherwise `text` is the terminal answer.
pub fn parse_reply(value: Value) -> Result<BridgeReply> {
    let plan = value
        .get("plan")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_owned);

    let deltas: Vec<String> = value
        .get("deltas")
        .and_then(Value::as_array)
        .map(|arr| {
            arr.iter()
                .filter_map(Value::as_str)
                .map(str::to_owned)
                .collect()
        })
        .unwrap_or_default();

    if let Some(raw_requests) = value.get("tool_requests").and_then(Value::as_array) {
        if !raw_requests.is_empty() {
            let requests: Vec<ToolRequest> =
                serde_json::from_value(Value::Array(raw_requests.clone()))
                    .map_err(|e| Error::BridgeProtocol(format!("decoding tool_requests: {e}")))?;
            return Ok(BridgeReply {
                plan,
                deltas,
                outcome: BridgeOutcome::ToolRequests(requests),
            });
        }
    }

    let text = value
        .get("text")
        .and_then(Value::as_str)
        .ok_or_else(|| {
            Error::BridgeProtocol("reply has neither tool_requests nor text".into())
        })?
        .to_owned();

    Ok(BridgeReply {
        plan,
        deltas,
        outcome: BridgeOutcome::Final { text },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_terminal_reply() {
        let reply = parse_reply(serde_json::json!({
            "plan": "do the thing",
            "deltas": ["do", "ne"],
            "text": "done"
        }))
        .unwrap();
        assert_eq!(reply.plan.as_deref(), Some("do the thing"));
        assert_eq!(reply.deltas, vec!["do", "ne"]);
        assert_eq!(reply.outcome, BridgeOutcome::Final { text: "done".into() });
    }

    #[test]
    fn parse_tool_requests_reply() {
        let reply = parse_reply(serde_json::json!({
            "tool_requests": [
                { "tool_call_id": "t1", "name": "fs.read", "arguments": { "path": "a" } }
            ]
        }))
        .unwrap();
        match reply.outcome {
            BridgeOutcome::ToolRequests(reqs) => {
                assert_eq!(reqs.len(), 1);
                assert_eq!(reqs[0].name, "fs.read");
            }
            other => panic!("expected tool requests, got {other:?}"),
        }
    }

    #[test]
    fn empty_tool_requests_falls_through_to_text() {
        let reply = parse_reply(serde_json::json!({
            "tool_requests": [],
            "text": "answer"
        }))
        .unwrap();
        assert_eq!(reply.outcome, BridgeOutcome::Final { text: "answer".into() });
    }

    #[test]
    fn reply_without_text_or_requests_is_protocol_error() {
        let err = parse_reply(serde_json::json!({ "plan": "thinking" })).unwrap_err();
        assert_eq!(err.wire_code(), "BRIDGE_PROTOCOL");
    }

    #[test]
    fn empty_plan_is_treated_as_absent() {
        let reply = parse_reply(serde_json::json!({ "plan": "", "text": "ok" })).unwrap();
        assert!(reply.plan.is_none());
    }
}
