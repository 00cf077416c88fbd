use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Gateway (Discord edge) — where progress events are pushed
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct GatewayConfig {
    /// Base URL of the Discord gateway service. Events are POSTed to
    /// `{base_url}/internal/stream-events`.
    #[serde(default)]
    pub base_url: String,
    /// Shared secret sent as `x-internal-token` on every event push.
    #[serde(default)]
    pub internal_token: String,
}

impl GatewayConfig {
    pub fn stream_events_url(&self) -> String {
        format!("{}/internal/stream-events", self.base_url.trim_end_matches('/'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stream_events_url_strips_trailing_slash() {
        let cfg = GatewayConfig {
            base_url: "http://gateway:9000/".into(),
            internal_token: String::new(),
        };
        assert_eq!(
            cfg.stream_events_url(),
            "http://gateway:9000/internal/stream-events"
        );
    }
}
