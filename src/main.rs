//! Cache Node - A memory-bounded cache engine with content interning
//!
//! Runs the engine with its trim and metrics tasks behind a small HTTP
//! admin surface.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cache_node::api::create_router;
use cache_node::cache::SysinfoProbe;
use cache_node::{spawn_sampler_task, spawn_trim_task, AppState, Config, MetricsSampler};

/// Main entry point for the cache node.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load and validate configuration from environment variables
/// 3. Create the engine with a store sized from physical memory
/// 4. Start the trim and metrics background tasks
/// 5. Serve the admin API until SIGINT/SIGTERM
/// 6. Cancel background tasks and wait for them to finish
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cache_node=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting cache node");

    let config = Config::from_env();
    config.validate().context("invalid configuration")?;
    info!(
        "Configuration loaded: memory_limit={}%, trim_interval={}s, metrics_interval={}s, port={}",
        config.memory_limit_percent, config.trim_interval, config.metrics_interval, config.server_port
    );

    let state = AppState::from_config(&config).context("failed to create cache engine")?;
    info!(
        "Cache engine initialized with a {} MB limit",
        state.engine.memory_limit_mb()
    );

    let cancel = CancellationToken::new();
    let trim_handle = spawn_trim_task(state.engine.clone(), config.trim_period(), cancel.clone());
    let sampler = MetricsSampler::new(
        state.engine.clone(),
        Arc::new(SysinfoProbe::new()),
        state.metrics.clone(),
    );
    let sampler_handle =
        spawn_sampler_task(Arc::new(sampler), config.metrics_period(), cancel.clone());

    let app = create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    cancel.cancel();
    let _ = tokio::join!(trim_handle, sampler_handle);

    info!("Server shutdown complete");
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }
}
