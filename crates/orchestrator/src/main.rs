use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::EnvFilter;

use codial_domain::config::{Config, ConfigSeverity};
use codial_orchestrator::{api, bootstrap};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "codial-core starting");

    // ── Config (env) + validation ────────────────────────────────────
    let config = Arc::new(Config::from_env());
    let issues = config.validate();
    for issue in &issues {
        match issue.severity {
            ConfigSeverity::Warning => tracing::warn!("config: {issue}"),
            ConfigSeverity::Error => tracing::error!("config: {issue}"),
        }
    }
    if issues.iter().any(|i| i.severity == ConfigSeverity::Error) {
        anyhow::bail!(
            "config validation failed with {} error(s)",
            issues
                .iter()
                .filter(|i| i.severity == ConfigSeverity::Error)
                .count()
        );
    }

    // ── Build the runtime ────────────────────────────────────────────
    let (state, pool) = bootstrap::build_app_state(config.clone()).await?;
    bootstrap::spawn_background_tasks(&state);

    let app = api::router(state.clone())
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(state.clone());

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(addr = %addr, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // ── Graceful drain ───────────────────────────────────────────────
    tracing::info!("shutdown requested, draining turn workers");
    state.queue.close();
    pool.shutdown(
        Duration::from_secs(config.turns.drain_deadline_seconds),
        &state.cancel_map,
        &state.turns,
    )
    .await;
    tracing::info!("codial-core stopped");

    Ok(())
}

/// Structured JSON tracing with env-filter control.
fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,codial_orchestrator=debug")),
        )
        .json()
        .init();
}

/// Resolve on ctrl-c or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("installing ctrl-c handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("installing SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
