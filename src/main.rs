//! RPC Failover Proxy
//!
//! A failover-aware reverse proxy for JSON-RPC blockchain endpoints,
//! built with Tokio and Axum.
//!
//! # Architecture Overview
//!
//! ```text
//!                       ┌──────────────────────────────────────────────┐
//!                       │               FAILOVER PROXY                 │
//!                       │                                              │
//!  Client POST /rpc     │  ┌─────────┐   ┌───────────────────────────┐ │
//!  ─────────────────────┼─▶│  http   │──▶│ failover registry (per-set│ │
//!                       │  │ server  │   │ lock-guarded state)       │ │
//!                       │  └─────────┘   └───────────┬───────────────┘ │
//!                       │                            │ active URL      │
//!                       │                            ▼                 │
//!  Client Response      │  ┌─────────┐   ┌───────────────────────────┐ │     Primary /
//!  ◀────────────────────┼──│classify │◀──│       proxy client        │◀┼───  Fallback
//!                       │  │ + relay │   │     (bounded timeout)     │ │     endpoint
//!                       │  └─────────┘   └───────────────────────────┘ │
//!                       │                                              │
//!                       │  ┌────────────────────────────────────────┐  │
//!                       │  │ health monitor (periodic, cancellable) │  │
//!                       │  │   probes primaries, demotes/promotes   │  │
//!                       │  └────────────────────────────────────────┘  │
//!                       │  ┌────────────────────────────────────────┐  │
//!                       │  │ config │ observability │ lifecycle     │  │
//!                       │  └────────────────────────────────────────┘  │
//!                       └──────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;

use rpc_failover::config::loader::load_config;
use rpc_failover::failover::EndpointRegistry;
use rpc_failover::http::HttpServer;
use rpc_failover::lifecycle::Shutdown;
use rpc_failover::observability;

#[derive(Parser)]
#[command(name = "rpc-failover")]
#[command(about = "Failover-aware reverse proxy for JSON-RPC blockchain endpoints", long_about = None)]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(short, long)]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let config = load_config(&args.config)?;

    observability::logging::init(&config.observability.log_level);

    tracing::info!(
        bind_address = %config.listener.bind_address,
        endpoint_sets = config.endpoint_sets.len(),
        health_check_interval_secs = config.failover.health_check_interval_secs,
        request_timeout_secs = config.failover.request_timeout_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => observability::metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let registry = Arc::new(EndpointRegistry::from_config(&config.endpoint_sets)?);

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let signal_shutdown = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Shutdown signal received");
            signal_shutdown.trigger();
        }
    });

    let server = HttpServer::new(config, registry);
    server.run(listener, shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
