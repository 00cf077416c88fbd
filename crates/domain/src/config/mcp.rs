use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// MCP (Model Context Protocol)
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpConfig {
    /// JSON-RPC endpoint of the MCP server. `None` = no MCP client; the
    /// turn engine proceeds with empty tool metadata.
    #[serde(default)]
    pub server_url: Option<String>,
    #[serde(default)]
    pub server_token: Option<String>,
    /// Per-request deadline (seconds); expirations surface as `MCP_TIMEOUT`.
    #[serde(default = "d_mcp_timeout")]
    pub request_timeout_seconds: u64,
}

impl Default for McpConfig {
    fn default() -> Self {
        Self {
            server_url: None,
            server_token: None,
            request_timeout_seconds: d_mcp_timeout(),
        }
    }
}

fn d_mcp_timeout() -> u64 {
    30
}
