//! Portal daemon: serves the authenticated relay over TCP

pub mod config;

pub use config::{DaemonConfig, HttpConfig, LogConfig};

use portal_http::{AppState, HttpServer, routes};
use std::future::Future;
use tokio::net::TcpListener;
use tracing::info;

/// Result type for daemon operations
pub type Result<T> = std::result::Result<T, DaemonError>;

/// Daemon error types
#[derive(Debug, thiserror::Error)]
pub enum DaemonError {
    #[error("Configuration error: {0}")]
    Config(#[from] ::config::ConfigError),

    #[error("Configuration error: {0}")]
    ConfigString(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP server error: {0}")]
    Http(#[from] portal_http::HttpError),

    #[error("Server error: {0}")]
    Server(String),
}

/// Bind the configured HTTP address
pub async fn bind(config: &DaemonConfig) -> Result<TcpListener> {
    let listener = TcpListener::bind(config.http.bind_addr).await?;
    Ok(listener)
}

/// Serve the relay on `listener` until `shutdown` resolves
pub async fn serve<F>(listener: TcpListener, config: &DaemonConfig, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send,
{
    info!(
        backend = %config.relay.base_url(),
        prefixes = ?config.relay.allowed_prefixes,
        "Relay configured"
    );

    let state = AppState::new(config.relay.clone())?;
    let server = HttpServer::new(routes::router(state));
    server
        .serve(listener, shutdown)
        .await
        .map_err(|e| DaemonError::Server(e.to_string()))
}
