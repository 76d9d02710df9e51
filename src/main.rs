//! Concurrent API Gateway
//!
//! # Architecture Overview
//!
//! ```text
//!                         ┌──────────────────────────────────────────────────┐
//!                         │                     GATEWAY                      │
//!                         │                                                  │
//!   GET /api/aggregate    │  ┌─────────┐    ┌────────────┐    ┌───────────┐  │
//!   ──────────────────────┼─▶│  http   │───▶│ aggregator │───▶│dispatcher │──┼──▶ user
//!                         │  │ server  │    │ + deadline │    │ (1 task   │──┼──▶ orders
//!                         │  └─────────┘    └────────────┘    │ per svc)  │──┼──▶ notifications
//!                         │       ▲                           └─────┬─────┘  │
//!                         │       │         ┌────────────┐          │        │
//!   200 {data, errors,    │       └─────────│ collector  │◀─────────┘        │
//!   ◀─────────────────────┼─ duration_ms,   │ (N outcomes)                   │
//!      timed_out}         │                 └────────────┘                   │
//!                         │                                                  │
//!                         │  config · observability · resilience · lifecycle │
//!                         └──────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use concurrent_api_gateway::config::{load_config, watcher::ConfigWatcher, GatewayConfig};
use concurrent_api_gateway::http::HttpServer;
use concurrent_api_gateway::lifecycle::{signals::wait_for_shutdown_signal, Shutdown};
use concurrent_api_gateway::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "concurrent-api-gateway")]
#[command(about = "Aggregates downstream services behind one endpoint", long_about = None)]
struct Cli {
    /// TOML configuration file; built-in defaults when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Reload the configuration file when it changes.
    #[arg(short, long, requires = "config")]
    watch: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => GatewayConfig::default(),
    };

    logging::init_logging(&config.observability);
    tracing::info!("concurrent-api-gateway v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        budget_ms = config.aggregation.budget_ms,
        services = config.services.len(),
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    // Keep the watcher alive for the lifetime of the server.
    let (_watcher, config_updates) = match (&cli.config, cli.watch) {
        (Some(path), true) => {
            let (watcher, updates) = ConfigWatcher::new(path);
            (Some(watcher.run()?), updates)
        }
        _ => (None, mpsc::unbounded_channel().1),
    };

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let server = HttpServer::new(config)?;
    let server_task = tokio::spawn(server.run(listener, config_updates, shutdown.subscribe()));

    wait_for_shutdown_signal().await;
    shutdown.trigger();
    server_task.await??;

    tracing::info!("Shutdown complete");
    Ok(())
}
