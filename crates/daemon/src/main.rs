//! Tilepace - Main Entry Point
//! Paced map-tile/style relay: HTTP server + single drain loop

mod config;

use anyhow::Result;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

// Import workspace crates
use config::{DaemonConfig, LogFormat};
use tilepace_api_http::HttpServer;
use tilepace_core::application::{MapProxyService, PacedQueue};
use tilepace_core::domain::QueueConfig;
use tilepace_core::port::UpstreamFetcher;
use tilepace_infra_http::ReqwestUpstream;

const VERSION: &str = env!("CARGO_PKG_VERSION");

fn init_logging(format: LogFormat) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("tilepace=info,tower_http=info"))?;

    match format {
        LogFormat::Json => {
            // Production: JSON structured logging
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json())
                .try_init()?;
        }
        LogFormat::Pretty => {
            // Development: Pretty formatting with colors
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().pretty())
                .try_init()?;
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Load configuration
    let config = DaemonConfig::from_env()?;

    // 2. Initialize logging
    init_logging(config.log_format)?;

    info!("Tilepace v{} starting...", VERSION);
    info!(
        upstream = %config.upstream.base_url,
        token_configured = config.upstream.access_token.is_some(),
        timeout_secs = config.upstream.timeout.as_secs(),
        "Upstream configured"
    );

    // 3. Setup dependencies (DI wiring)
    let upstream: Arc<dyn UpstreamFetcher> = Arc::new(ReqwestUpstream::new(config.upstream)?);

    // Pacing and capacity are process-wide constants
    let queue_config = QueueConfig::default();
    info!(
        queue = %queue_config.name,
        capacity = queue_config.capacity,
        pacing_ms = u64::try_from(queue_config.pacing.as_millis()).unwrap_or(u64::MAX),
        "Creating relay queue"
    );
    let queue = Arc::new(PacedQueue::new(queue_config));
    let service = Arc::new(MapProxyService::new(queue.clone(), upstream));

    // 4. Start HTTP server
    let server = HttpServer::new(config.http, service).start().await?;

    info!(addr = %server.local_addr(), "System ready. Relaying map requests");
    info!("Press Ctrl+C to shutdown");

    // 5. Wait for shutdown signal
    tokio::signal::ctrl_c().await?;

    info!("Shutdown signal received. Exiting gracefully...");

    // 6. Graceful shutdown: stop accepting, then let queued relays finish.
    // In-flight requests hold the server open until their item has run.
    let drained = tokio::time::timeout(config.shutdown_grace, async {
        server.shutdown().await;
        queue.wait_idle().await;
    })
    .await;

    if drained.is_err() {
        warn!(
            remaining = queue.size(),
            grace_secs = config.shutdown_grace.as_secs(),
            "Queue did not drain before the grace period ended"
        );
    }

    info!("Shutdown complete.");

    Ok(())
}
