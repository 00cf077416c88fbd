//! GitHub Copilot bridge provider with auth bootstrap.
//!
//! Token resolution order: injected token (config/env) → cache file →
//! login endpoint. A token obtained from the login endpoint is written
//! back to the cache atomically with 0600 permissions.

use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use codial_domain::config::{CopilotConfig, ProvidersConfig};
use codial_domain::error::{Error, Result};

use crate::bridge::BridgeClient;
use crate::traits::{BridgeProvider, BridgeReply, BridgeRequest};

pub const PROVIDER_NAME: &str = "github-copilot-sdk";

/// On-disk shape of the auth cache: `{token, obtained_at}`.
#[derive(Debug, Serialize, Deserialize)]
struct AuthCache {
    token: String,
    obtained_at: DateTime<Utc>,
}

pub struct CopilotProvider {
    client: BridgeClient,
}

impl CopilotProvider {
    /// Build the provider, resolving a bearer token up front.
    pub async fn bootstrap(config: &ProvidersConfig) -> Result<Self> {
        let copilot = &config.copilot;
        if copilot.bridge_base_url.is_empty() {
            return Err(Error::Config(
                "CORE_COPILOT_BRIDGE_BASE_URL is required for the Copilot provider".into(),
            ));
        }

        let token = resolve_token(copilot).await?;
        let client = BridgeClient::new(
            &copilot.bridge_base_url,
            Some(token),
            Duration::from_secs(config.bridge_timeout_seconds),
        )?;

        Ok(Self { client })
    }
}

#[async_trait::async_trait]
impl BridgeProvider for CopilotProvider {
    async fn run(&self, req: &BridgeRequest) -> Result<BridgeReply> {
        self.client.run_round(req).await
    }

    fn name(&self) -> &str {
        PROVIDER_NAME
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Auth bootstrap
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

async fn resolve_token(config: &CopilotConfig) -> Result<String> {
    // 1. Injected token.
    if let Some(token) = config.bridge_token.as_deref().filter(|t| !t.is_empty()) {
        tracing::info!("copilot auth: using injected token");
        return Ok(token.to_owned());
    }

    // 2. Cache file.
    if let Some(cached) = read_cache(&config.auth_cache_path) {
        tracing::info!(
            obtained_at = %cached.obtained_at,
            "copilot auth: using cached token"
        );
        return Ok(cached.token);
    }

    // 3. Login endpoint.
    if !config.auto_login_enabled {
        return Err(Error::ProviderAuth(
            "no copilot token available and auto-login is disabled".into(),
        ));
    }
    let token = login(config).await?;
    if let Err(e) = write_cache(&config.auth_cache_path, &token) {
        tracing::warn!(error = %e, "copilot auth: failed to update cache");
    }
    Ok(token)
}

fn read_cache(path: &Path) -> Option<AuthCache> {
    let raw = std::fs::read_to_string(path).ok()?;
    match serde_json::from_str::<AuthCache>(&raw) {
        Ok(cache) if !cache.token.is_empty() => Some(cache),
        Ok(_) => None,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "ignoring malformed copilot auth cache");
            None
        }
    }
}

fn write_cache(path: &Path, token: &str) -> Result<()> {
    let dir = path.parent().unwrap_or(Path::new("."));
    std::fs::create_dir_all(dir)?;
    let cache = AuthCache {
        token: token.to_owned(),
        obtained_at: Utc::now(),
    };
    let tmp = tempfile::NamedTempFile::new_in(dir)?;
    std::fs::write(tmp.path(), serde_json::to_string_pretty(&cache)?)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(tmp.path(), std::fs::Permissions::from_mode(0o600))?;
    }
    tmp.persist(path)
        .map_err(|e| Error::Internal(format!("persisting {}: {}", path.display(), e.error)))?;
    Ok(())
}

async fn login(config: &CopilotConfig) -> Result<String> {
    let url = if config.login_endpoint.starts_with("http") {
        config.login_endpoint.clone()
    } else {
        format!(
            "{}{}",
            config.bridge_base_url.trim_end_matches('/'),
            config.login_endpoint
        )
    };

    tracing::info!(url = %url, "copilot auth: requesting token from login endpoint");
    let resp = reqwest::Client::new()
        .post(&url)
        .json(&serde_json::json!({}))
        .send()
        .await
        .map_err(|e| Error::ProviderAuth(format!("login request failed: {e}")))?;

    if !resp.status().is_success() {
        return Err(Error::ProviderAuth(format!(
            "login endpoint returned {}",
            resp.status()
        )));
    }

    let body: Value = resp
        .json()
        .await
        .map_err(|e| Error::ProviderAuth(format!("decoding login response: {e}")))?;

    extract_token(&body)
        .ok_or_else(|| Error::ProviderAuth("login response carried no recognizable token".into()))
}

/// Accepted token keys, at the top level or nested under `data`.
const TOKEN_KEYS: [&str; 4] = ["token", "access_token", "bearer_token", "api_key"];

fn extract_token(body: &Value) -> Option<String> {
    for key in TOKEN_KEYS {
        if let Some(token) = body.get(key).and_then(Value::as_str) {
            if !token.is_empty() {
                return Some(token.to_owned());
            }
        }
    }
    if let Some(data) = body.get("data") {
        for key in TOKEN_KEYS {
            if let Some(token) = data.get(key).and_then(Value::as_str) {
                if !token.is_empty() {
                    return Some(token.to_owned());
                }
            }
        }
    }
    None
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
