//! HTTP Server
//!
//! Binds a TCP listener and serves the router until its `ServerHandle` is
//! shut down or dropped.

use crate::handler::{health, map_proxy, ApiState};
use axum::routing::get;
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use tilepace_core::application::MapProxyService;
use tilepace_core::error::{AppError, Result};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 8787;

/// HTTP Server Configuration
#[derive(Debug, Clone)]
pub struct HttpServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for HttpServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
        }
    }
}

/// Build the application router
pub fn router(service: Arc<MapProxyService>) -> Router {
    let state = Arc::new(ApiState::new(service));

    Router::new()
        .route("/map-proxy/{*path}", get(map_proxy))
        .route("/health", get(health))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Running server
///
/// Dropping the handle also stops accepting connections; requests already
/// accepted are still answered.
pub struct ServerHandle {
    local_addr: SocketAddr,
    stop: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl ServerHandle {
    /// Address actually bound (useful with port 0)
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stop accepting connections and wait for in-flight requests to finish
    ///
    /// An in-flight proxy request holds the server open until its queue item
    /// has run.
    pub async fn shutdown(self) {
        let _ = self.stop.send(());
        if let Err(e) = self.task.await {
            error!(error = ?e, "HTTP server task failed");
        }
    }
}

/// HTTP Server
pub struct HttpServer {
    config: HttpServerConfig,
    service: Arc<MapProxyService>,
}

impl HttpServer {
    pub fn new(config: HttpServerConfig, service: Arc<MapProxyService>) -> Self {
        Self { config, service }
    }

    /// Bind and start serving in the background
    ///
    /// # Errors
    /// - AppError::Io if the address cannot be bound
    pub async fn start(self) -> Result<ServerHandle> {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        let listener = TcpListener::bind(&addr).await?;
        let local_addr = listener.local_addr()?;

        info!(addr = %local_addr, "Starting HTTP server");

        let app = router(self.service);
        let (stop, stopped) = oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            let result = axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    // Resolves on an explicit stop and when the handle is dropped
                    let _ = stopped.await;
                })
                .await;
            match result {
                Ok(()) => info!("HTTP server stopped"),
                Err(e) => error!(error = %AppError::Io(e), "HTTP server exited with error"),
            }
        });

        Ok(ServerHandle {
            local_addr,
            stop,
            task,
        })
    }
}
