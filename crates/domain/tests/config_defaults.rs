use codial_domain::config::{Config, ConfigSeverity};

#[test]
fn default_host_is_localhost() {
    let config = Config::default();
    assert_eq!(config.server.host, "127.0.0.1");
    assert_eq!(config.server.port, 8787);
}

#[test]
fn defaults_match_documented_paths() {
    let config = Config::default();
    assert_eq!(
        config.providers.copilot.auth_cache_path.to_str().unwrap(),
        ".runtime/copilot-auth.json"
    );
    assert_eq!(
        config.attachments.storage_dir.to_str().unwrap(),
        ".runtime/attachments"
    );
    assert_eq!(config.turns.worker_count, 2);
}

#[test]
fn explicit_overrides_parse() {
    let json = serde_json::json!({
        "server": { "host": "0.0.0.0", "port": 9000 },
        "turns": { "worker_count": 4 },
        "providers": { "enabled": ["github-copilot-sdk", "openai-codex"] }
    });
    let config: Config = serde_json::from_value(json).unwrap();
    assert_eq!(config.server.host, "0.0.0.0");
    assert_eq!(config.turns.worker_count, 4);
    assert!(config.providers.is_enabled("openai-codex"));
}

#[test]
fn validate_flags_disabled_default_provider() {
    let json = serde_json::json!({
        "providers": { "default_provider": "openai-codex", "enabled": ["github-copilot-sdk"] }
    });
    let config: Config = serde_json::from_value(json).unwrap();
    let issues = config.validate();
    assert!(issues
        .iter()
        .any(|i| i.severity == ConfigSeverity::Error && i.message.contains("openai-codex")));
}

#[test]
fn validate_flags_zero_workers() {
    let json = serde_json::json!({ "turns": { "worker_count": 0 } });
    let config: Config = serde_json::from_value(json).unwrap();
    assert!(config
        .validate()
        .iter()
        .any(|i| i.severity == ConfigSeverity::Error));
}
