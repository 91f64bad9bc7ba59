//! RPC edge proxy.
//!
//! # Architecture Overview
//!
//! ```text
//!                      ┌──────────────────────────────────────────────────────┐
//!                      │                     EDGE PROXY                        │
//!                      │                                                      │
//!   Client Request     │  ┌────────┐   ┌───────────┐   ┌───────────┐          │
//!   ───────────────────┼─▶│  CORS  │──▶│ allowlist │──▶│ rate      │          │
//!                      │  │ policy │   │   gate    │   │ limiter   │          │
//!                      │  └────────┘   └─────┬─────┘   └─────┬─────┘          │
//!                      │                     │               │    ┌────────┐  │
//!                      │                     │               └───▶│ counter│  │
//!                      │                     ▼                    │ store  │  │
//!                      │               ┌───────────┐              └────────┘  │
//!   Client Response    │               │ routing + │                          │
//!   ◀──────────────────┼───────────────│ dispatch  │◀─────────────────────────┼──── Upstream
//!                      │               └───────────┘                          │     RPC / API
//!                      └──────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;

use rpc_edge_proxy::config::load_config;
use rpc_edge_proxy::lifecycle::startup;
use rpc_edge_proxy::observability::logging::init_logging;

#[derive(Parser)]
#[command(name = "rpc-edge-proxy")]
#[command(about = "Rate-limiting edge proxy for JSON-RPC and WebSocket traffic", long_about = None)]
struct Cli {
    /// TOML config file. Environment variables override its values.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = load_config(cli.config.as_deref())?;
    init_logging(&config.observability);

    tracing::info!(
        bind_address = %config.listener.bind_address,
        max_requests = config.rate_limit.max_requests,
        window_secs = config.rate_limit.window_secs,
        allowlisted = config.rate_limit.allowlist.len(),
        store = ?config.store.backend,
        "Configuration loaded"
    );

    startup::run(config).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
