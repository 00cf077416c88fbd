//! HTTP JSON-RPC client for a single MCP server.
//!
//! Every request carries a strictly-monotonic integer `id` allocated from
//! an atomic counter; responses are matched by `id`. The connection is
//! ready once the `initialize` / `notifications/initialized` handshake
//! completes.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde_json::Value;

use codial_domain::config::McpConfig;

use crate::protocol::{
    self, JsonRpcNotification, JsonRpcRequest, JsonRpcResponse, McpPromptDef, McpResourceDef,
    McpResourceTemplateDef, McpToolDef, Page, ToolCallResult,
};

/// Errors specific to MCP operations.
#[derive(Debug, thiserror::Error)]
pub enum McpError {
    #[error("MCP transport error: {0}")]
    Transport(String),

    #[error("MCP request timed out: {0}")]
    Timeout(String),

    #[error("MCP protocol error: {0}")]
    Protocol(String),
}

impl From<McpError> for codial_domain::error::Error {
    fn from(e: McpError) -> Self {
        match e {
            McpError::Timeout(msg) => codial_domain::error::Error::McpTimeout(msg),
            other => codial_domain::error::Error::Mcp(other.to_string()),
        }
    }
}

pub struct McpClient {
    http: reqwest::Client,
    endpoint: String,
    token: Option<String>,
    timeout: Duration,
    next_id: AtomicU64,
    /// Capabilities advertised by the server during `initialize`.
    server_capabilities: Value,
}

impl McpClient {
    /// Connect to the configured server and perform the MCP handshake.
    ///
    /// Returns `Ok(None)` when no server URL is configured — the caller
    /// runs without tool metadata in that case.
    pub async fn connect(config: &McpConfig) -> Result<Option<Self>, McpError> {
        let Some(endpoint) = config.server_url.clone() else {
            tracing::info!("no MCP server configured");
            return Ok(None);
        };

        let timeout = Duration::from_secs(config.request_timeout_seconds);
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| McpError::Transport(e.to_string()))?;

        let mut client = Self {
            http,
            endpoint,
            token: config.server_token.clone(),
            timeout,
            next_id: AtomicU64::new(1),
            server_capabilities: Value::Null,
        };

        // Step 1: `initialize` — record the server's capabilities.
        let init_params = serde_json::to_value(protocol::initialize_params())
            .map_err(|e| McpError::Protocol(format!("serializing initialize params: {e}")))?;
        let init_result = client.request("initialize", Some(init_params)).await?;
        client.server_capabilities = init_result
            .get("capabilities")
            .cloned()
            .unwrap_or(Value::Null);

        // Step 2: `notifications/initialized`.
        client.notify("notifications/initialized").await?;

        tracing::info!(endpoint = %client.endpoint, "MCP client ready");
        Ok(Some(client))
    }

    pub fn server_capabilities(&self) -> &Value {
        &self.server_capabilities
    }

    // ── JSON-RPC plumbing ────────────────────────────────────────────

    fn next_request_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    fn post(&self, body: &impl serde::Serialize) -> reqwest::RequestBuilder {
        let mut rb = self.http.post(&self.endpoint).json(body);
        if let Some(token) = &self.token {
            rb = rb.bearer_auth(token);
        }
        rb
    }

    /// Send a request and wait for the matching response.
    async fn request(&self, method: &str, params: Option<Value>) -> Result<Value, McpError> {
        let id = self.next_request_id();
        let req = JsonRpcRequest::new(id, method, params);
        tracing::debug!(id, method, "sending MCP request");

        let resp = self.post(&req).send().await.map_err(|e| {
            if e.is_timeout() {
                McpError::Timeout(format!("{method} exceeded {:?}", self.timeout))
            } else {
                McpError::Transport(e.to_string())
            }
        })?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(McpError::Transport(format!(
                "{method} returned HTTP {status}: {body}"
            )));
        }

        let parsed: JsonRpcResponse = resp
            .json()
            .await
            .map_err(|e| McpError::Protocol(format!("decoding {method} response: {e}")))?;

        if parsed.id != id {
            return Err(McpError::Protocol(format!(
                "{method} response id mismatch: expected {id}, got {}",
                parsed.id
            )));
        }

        parsed
            .into_result()
            .map_err(|e| McpError::Protocol(format!("{method} failed: {e}")))
    }

    async fn notify(&self, method: &str) -> Result<(), McpError> {
        let notif = JsonRpcNotification::new(method);
        tracing::debug!(method, "sending MCP notification");
        let resp = self.post(&notif).send().await.map_err(|e| {
            if e.is_timeout() {
                McpError::Timeout(format!("{method} exceeded {:?}", self.timeout))
            } else {
                McpError::Transport(e.to_string())
            }
        })?;
        if !resp.status().is_success() {
            return Err(McpError::Transport(format!(
                "{method} returned HTTP {}",
                resp.status()
            )));
        }
        Ok(())
    }

    /// Drain a paginated `*/list` method by following `nextCursor`.
    async fn paginate<T: serde::de::DeserializeOwned>(
        &self,
        method: &str,
    ) -> Result<Vec<T>, McpError> {
        let mut items = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let params = cursor
                .as_ref()
                .map(|c| serde_json::json!({ "cursor": c }));
            let result = self.request(method, params).await?;
            let page: Page<T> = serde_json::from_value(result)
                .map_err(|e| McpError::Protocol(format!("decoding {method} page: {e}")))?;
            items.extend(page.items);
            match page.next_cursor {
                Some(next) => cursor = Some(next),
                None => return Ok(items),
            }
        }
    }

    // ── Discovery ────────────────────────────────────────────────────

    pub async fn list_tools(&self) -> Result<Vec<McpToolDef>, McpError> {
        self.paginate("tools/list").await
    }

    pub async fn list_prompts(&self) -> Result<Vec<McpPromptDef>, McpError> {
        self.paginate("prompts/list").await
    }

    pub async fn list_resources(&self) -> Result<Vec<McpResourceDef>, McpError> {
        self.paginate("resources/list").await
    }

    pub async fn list_resource_templates(&self) -> Result<Vec<McpResourceTemplateDef>, McpError> {
        self.paginate("resources/templates/list").await
    }

    // ── Invocation ───────────────────────────────────────────────────

    /// Call a tool. A JSON-RPC error surfaces as `Err`; a tool-level
    /// failure surfaces as `Ok` with `is_error = true`.
    pub async fn call_tool(
        &self,
        tool_name: &str,
        arguments: Value,
    ) -> Result<ToolCallResult, McpError> {
        let params = serde_json::json!({
            "name": tool_name,
            "arguments": arguments,
        });
        let result = self.request("tools/call", Some(params)).await?;
        serde_json::from_value(result)
            .map_err(|e| McpError::Protocol(format!("decoding tools/call result: {e}")))
    }

    pub async fn ping(&self) -> Result<(), McpError> {
        self.request("ping", None).await.map(|_| ())
    }
}
