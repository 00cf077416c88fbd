//! Tool backend seam between the turn engine and MCP.
//!
//! The engine programs against [`ToolBackend`]; the production
//! implementation wraps the MCP client. Tests substitute a scripted
//! backend.

use std::sync::Arc;

use serde_json::Value;

use codial_domain::error::Result;
use codial_mcp_client::McpClient;
use codial_providers::ToolManifestEntry;

/// The outcome of one tool invocation. `is_error` marks a tool-level
/// failure (the tool ran and reported an error), as opposed to a
/// transport failure which surfaces as `Err`.
#[derive(Debug, Clone)]
pub struct ToolCallOutput {
    pub text: String,
    pub is_error: bool,
}

#[async_trait::async_trait]
pub trait ToolBackend: Send + Sync {
    /// The tool manifest handed to the provider bridge.
    async fn manifest(&self) -> Result<Vec<ToolManifestEntry>>;

    /// Invoke one tool. Never retried: a failure is surfaced to the next
    /// bridge round as a tool-result error.
    async fn call(&self, name: &str, arguments: Value) -> Result<ToolCallOutput>;
}

/// MCP-backed tool backend.
pub struct McpToolBackend {
    client: Arc<McpClient>,
}

impl McpToolBackend {
    pub fn new(client: Arc<McpClient>) -> Self {
        Self { client }
    }
}

#[async_trait::async_trait]
impl ToolBackend for McpToolBackend {
    async fn manifest(&self) -> Result<Vec<ToolManifestEntry>> {
        let tools = self.client.list_tools().await?;
        Ok(tools
            .into_iter()
            .map(|t| ToolManifestEntry {
                name: t.name,
                description: t.description,
                input_schema: t.input_schema,
            })
            .collect())
    }

    async fn call(&self, name: &str, arguments: Value) -> Result<ToolCallOutput> {
        let result = self.client.call_tool(name, arguments).await?;
        Ok(ToolCallOutput {
            text: result.text(),
            is_error: result.is_error,
        })
    }
}
