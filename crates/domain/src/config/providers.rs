use serde::{Deserialize, Serialize};
use std::path::PathBuf;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Provider bridges
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvidersConfig {
    /// Provider used to seed new sessions when `AGENTS.md` declares none.
    #[serde(default = "d_default_provider")]
    pub default_provider: String,
    /// Operator-enabled provider names; selections outside this set are
    /// rejected with `PROVIDER_NOT_ENABLED`.
    #[serde(default = "d_enabled")]
    pub enabled: Vec<String>,
    /// Per-call deadline for bridge requests (seconds).
    #[serde(default = "d_bridge_timeout")]
    pub bridge_timeout_seconds: u64,
    #[serde(default)]
    pub copilot: CopilotConfig,
    #[serde(default)]
    pub codex: CodexConfig,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            default_provider: d_default_provider(),
            enabled: d_enabled(),
            bridge_timeout_seconds: d_bridge_timeout(),
            copilot: CopilotConfig::default(),
            codex: CodexConfig::default(),
        }
    }
}

impl ProvidersConfig {
    pub fn is_enabled(&self, name: &str) -> bool {
        self.enabled.iter().any(|n| n == name)
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Copilot bridge
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CopilotConfig {
    #[serde(default)]
    pub bridge_base_url: String,
    /// Injected bearer token. When absent, the auth bootstrap falls back
    /// to the cache file and then the login endpoint.
    #[serde(default)]
    pub bridge_token: Option<String>,
    #[serde(default = "d_true")]
    pub auto_login_enabled: bool,
    #[serde(default = "d_auth_cache_path")]
    pub auth_cache_path: PathBuf,
    /// Login endpoint path or absolute URL. Relative paths resolve
    /// against `bridge_base_url`.
    #[serde(default = "d_login_endpoint")]
    pub login_endpoint: String,
}

impl Default for CopilotConfig {
    fn default() -> Self {
        Self {
            bridge_base_url: String::new(),
            bridge_token: None,
            auto_login_enabled: d_true(),
            auth_cache_path: d_auth_cache_path(),
            login_endpoint: d_login_endpoint(),
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Codex bridge
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CodexConfig {
    #[serde(default)]
    pub bridge_base_url: String,
    #[serde(default)]
    pub bridge_token: Option<String>,
}

// ── serde default helpers ───────────────────────────────────────────

fn d_default_provider() -> String {
    "github-copilot-sdk".into()
}
fn d_enabled() -> Vec<String> {
    vec!["github-copilot-sdk".into()]
}
fn d_bridge_timeout() -> u64 {
    120
}
fn d_true() -> bool {
    true
}
fn d_auth_cache_path() -> PathBuf {
    PathBuf::from(".runtime/copilot-auth.json")
}
fn d_login_endpoint() -> String {
    "/auth/login".into()
}
