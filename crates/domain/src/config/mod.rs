//! Orchestrator configuration, assembled from `CORE_*` environment
//! variables.
//!
//! Each concern lives in its own submodule with serde defaults, so a
//! `Config` can also be deserialized wholesale (tests do this). The
//! production path is [`Config::from_env`] followed by
//! [`Config::validate`], whose issues are logged at startup; errors abort
//! the boot.

mod attachments;
mod gateway;
mod mcp;
mod providers;
mod server;
mod turns;

pub use attachments::AttachmentsConfig;
pub use gateway::GatewayConfig;
pub use mcp::McpConfig;
pub use providers::{CodexConfig, CopilotConfig, ProvidersConfig};
pub use server::ServerConfig;
pub use turns::TurnsConfig;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub mcp: McpConfig,
    #[serde(default)]
    pub turns: TurnsConfig,
    #[serde(default)]
    pub attachments: AttachmentsConfig,
    /// Root directory scanned by the policy loader (`RULES.md`,
    /// `CODIAL.md`, `AGENTS.md`, skills, subagents).
    #[serde(default = "d_workspace_root")]
    pub workspace_root: PathBuf,
}

fn d_workspace_root() -> PathBuf {
    PathBuf::from(".")
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            gateway: GatewayConfig::default(),
            providers: ProvidersConfig::default(),
            mcp: McpConfig::default(),
            turns: TurnsConfig::default(),
            attachments: AttachmentsConfig::default(),
            workspace_root: d_workspace_root(),
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Environment loading
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

fn env_str(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
    match env_str(name) {
        Some(raw) => raw.parse().unwrap_or_else(|_| {
            tracing::warn!(var = name, value = %raw, "unparseable value, using default");
            default
        }),
        None => default,
    }
}

fn env_bool(name: &str, default: bool) -> bool {
    match env_str(name) {
        Some(raw) => matches!(raw.as_str(), "1" | "true" | "yes" | "on"),
        None => default,
    }
}

impl Config {
    /// Build a config from the `CORE_*` environment variables, falling
    /// back to serde defaults for anything unset.
    pub fn from_env() -> Self {
        let mut cfg = Config::default();

        if let Some(v) = env_str("CORE_HOST") {
            cfg.server.host = v;
        }
        cfg.server.port = env_parse("CORE_PORT", cfg.server.port);
        cfg.server.api_token = env_str("CORE_API_TOKEN");
        cfg.server.request_timeout_seconds =
            env_parse("CORE_REQUEST_TIMEOUT_SECONDS", cfg.server.request_timeout_seconds);

        if let Some(v) = env_str("CORE_GATEWAY_BASE_URL") {
            cfg.gateway.base_url = v;
        }
        if let Some(v) = env_str("CORE_GATEWAY_INTERNAL_TOKEN") {
            cfg.gateway.internal_token = v;
        }

        cfg.turns.worker_count = env_parse("CORE_TURN_WORKER_COUNT", cfg.turns.worker_count);

        if let Some(v) = env_str("CORE_DEFAULT_PROVIDER_NAME") {
            cfg.providers.default_provider = v;
        }
        if let Some(v) = env_str("CORE_ENABLED_PROVIDER_NAMES") {
            cfg.providers.enabled = v
                .split(',')
                .map(|s| s.trim().to_owned())
                .filter(|s| !s.is_empty())
                .collect();
        }
        cfg.providers.bridge_timeout_seconds = env_parse(
            "CORE_PROVIDER_BRIDGE_TIMEOUT_SECONDS",
            cfg.providers.bridge_timeout_seconds,
        );

        if let Some(v) = env_str("CORE_COPILOT_BRIDGE_BASE_URL") {
            cfg.providers.copilot.bridge_base_url = v;
        }
        cfg.providers.copilot.bridge_token = env_str("CORE_COPILOT_BRIDGE_TOKEN");
        cfg.providers.copilot.auto_login_enabled = env_bool(
            "CORE_COPILOT_AUTO_LOGIN_ENABLED",
            cfg.providers.copilot.auto_login_enabled,
        );
        if let Some(v) = env_str("CORE_COPILOT_AUTH_CACHE_PATH") {
            cfg.providers.copilot.auth_cache_path = PathBuf::from(v);
        }
        if let Some(v) = env_str("CORE_COPILOT_LOGIN_ENDPOINT") {
            cfg.providers.copilot.login_endpoint = v;
        }

        cfg.mcp.server_url = env_str("CORE_MCP_SERVER_URL");
        cfg.mcp.server_token = env_str("CORE_MCP_SERVER_TOKEN");
        cfg.mcp.request_timeout_seconds = env_parse(
            "CORE_MCP_REQUEST_TIMEOUT_SECONDS",
            cfg.mcp.request_timeout_seconds,
        );

        cfg.attachments.download_enabled = env_bool(
            "CORE_ATTACHMENT_DOWNLOAD_ENABLED",
            cfg.attachments.download_enabled,
        );
        cfg.attachments.download_max_bytes = env_parse(
            "CORE_ATTACHMENT_DOWNLOAD_MAX_BYTES",
            cfg.attachments.download_max_bytes,
        );
        if let Some(v) = env_str("CORE_ATTACHMENT_STORAGE_DIR") {
            cfg.attachments.storage_dir = PathBuf::from(v);
        }

        if let Some(v) = env_str("CORE_WORKSPACE_ROOT") {
            cfg.workspace_root = PathBuf::from(v);
        }

        cfg
    }

    /// Check the config for operational problems. Errors abort startup;
    /// warnings are logged and the boot continues.
    pub fn validate(&self) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();

        if self.server.api_token.is_none() {
            issues.push(ConfigIssue::warning(
                "CORE_API_TOKEN is unset — the API will accept unauthenticated requests",
            ));
        }
        if self.gateway.base_url.is_empty() {
            issues.push(ConfigIssue::warning(
                "CORE_GATEWAY_BASE_URL is unset — progress events cannot be delivered",
            ));
        }
        if self.turns.worker_count == 0 {
            issues.push(ConfigIssue::error("CORE_TURN_WORKER_COUNT must be at least 1"));
        }
        if self.providers.enabled.is_empty() {
            issues.push(ConfigIssue::error(
                "CORE_ENABLED_PROVIDER_NAMES resolves to an empty set",
            ));
        } else if !self.providers.is_enabled(&self.providers.default_provider) {
            issues.push(ConfigIssue::error(format!(
                "default provider '{}' is not in the enabled set",
                self.providers.default_provider
            )));
        }
        if self.attachments.download_enabled && self.attachments.download_max_bytes == 0 {
            issues.push(ConfigIssue::error(
                "attachment download is enabled with a zero byte cap",
            ));
        }

        issues
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Validation issues
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSeverity {
    Warning,
    Error,
}

#[derive(Debug, Clone)]
pub struct ConfigIssue {
    pub severity: ConfigSeverity,
    pub message: String,
}

impl ConfigIssue {
    fn warning(message: impl Into<String>) -> Self {
        Self {
            severity: ConfigSeverity::Warning,
            message: message.into(),
        }
    }

    fn error(message: impl Into<String>) -> Self {
        Self {
            severity: ConfigSeverity::Error,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ConfigIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}
