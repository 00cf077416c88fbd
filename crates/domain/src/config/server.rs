use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Server
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "d_host")]
    pub host: String,
    #[serde(default = "d_port")]
    pub port: u16,
    /// Bearer token required on every `/v1/*` route except health.
    /// `None` = dev mode (no auth enforced, readiness probe reports it).
    #[serde(default)]
    pub api_token: Option<String>,
    /// Default deadline applied to inbound request handling (seconds).
    #[serde(default = "d_request_timeout")]
    pub request_timeout_seconds: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: d_host(),
            port: d_port(),
            api_token: None,
            request_timeout_seconds: d_request_timeout(),
        }
    }
}

// ── serde default helpers ───────────────────────────────────────────

fn d_host() -> String {
    "127.0.0.1".into()
}
fn d_port() -> u16 {
    8787
}
fn d_request_timeout() -> u64 {
    30
}
