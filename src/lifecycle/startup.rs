//! Startup orchestration.
//!
//! # Responsibilities
//! - Initialize metrics and the counter store
//! - Build the HTTP server and bind the listener
//! - Serve until a termination signal arrives
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - The listener binds last, so traffic arrives only when ready

use thiserror::Error;
use tokio::net::TcpListener;

use crate::config::GatewayConfig;
use crate::http::dispatch::DispatchSetupError;
use crate::http::HttpServer;
use crate::lifecycle::{signals, Shutdown};
use crate::observability::metrics;
use crate::store::{build_store, StoreError};

/// Errors that abort startup.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("counter store: {0}")]
    Store(#[from] StoreError),

    #[error("dispatcher: {0}")]
    Dispatch(#[from] DispatchSetupError),

    #[error("listener: {0}")]
    Io(#[from] std::io::Error),
}

/// Run the gateway with `config` until SIGINT/SIGTERM.
pub async fn run(config: GatewayConfig) -> Result<(), StartupError> {
    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    if config.upstream.api_key.is_empty() {
        tracing::warn!("No upstream API key configured");
    }

    let shutdown = Shutdown::new();
    let store = build_store(&config.store, shutdown.subscribe())?;

    let bind_address = config.listener.bind_address.clone();
    let server = HttpServer::new(config, store)?;

    let listener = TcpListener::bind(&bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    signals::spawn_signal_listener(&shutdown);
    server.run(listener, shutdown.subscribe()).await?;

    shutdown.trigger();
    Ok(())
}
