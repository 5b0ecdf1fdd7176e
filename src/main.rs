//! Failover Proxy
//!
//! A reverse proxy in front of two interchangeable pools (blue, green).
//! One pool is primary, the other is backup. Failures are detected from live
//! traffic and retried against the backup inside the same client request.
//!
//! # Architecture Overview
//!
//! ```text
//!                      ┌────────────────────────────────────────────────┐
//!                      │                 FAILOVER PROXY                 │
//!                      │                                                │
//!   Client Request     │  ┌─────────┐    ┌───────────┐    ┌──────────┐  │
//!   ───────────────────┼─▶│  http   │───▶│  forward  │───▶│ routing  │  │
//!                      │  │ server  │    │  (retry)  │    │  table   │  │
//!                      │  └─────────┘    └─────┬─────┘    └────┬─────┘  │
//!                      │                       │               │        │
//!                      │                       ▼               ▼        │
//!   Client Response    │  ┌─────────┐    ┌───────────┐    ┌──────────┐  │
//!   ◀──────────────────┼──│response │◀───│  client   │    │  health  │  │
//!                      │  └─────────┘    └─────┬─────┘    │ tracker  │  │
//!                      │                       │          └──────────┘  │
//!                      └───────────────────────┼────────────────────────┘
//!                                              ▼
//!                                   primary ──▶ backup
//! ```

use std::path::PathBuf;
use clap::Parser;
use tokio::net::TcpListener;

use failover_proxy::config::{read_config, ConfigOverrides};
use failover_proxy::lifecycle::{signals, Shutdown};
use failover_proxy::observability::{logging, metrics};
use failover_proxy::{HttpServer, ProxyConfig};

#[derive(Debug, Parser)]
#[command(name = "failover-proxy")]
#[command(about = "Reverse proxy with passive health tracking and in-request failover")]
struct Cli {
    /// TOML configuration file; defaults apply when omitted
    #[arg(short, long, env = "PROXY_CONFIG")]
    config: Option<PathBuf>,

    #[command(flatten)]
    overrides: ConfigOverrides,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => read_config(path)?,
        None => ProxyConfig::default(),
    };
    cli.overrides.apply(&mut config);

    logging::init_logging(&config.observability);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "failover-proxy starting");

    // Validation happens here; nothing is bound before the table is valid.
    let server = HttpServer::new(config)?;

    let observability = &server.config().observability;
    if observability.metrics_enabled {
        let addr = observability.metrics_address.parse()?;
        metrics::init_metrics(addr)?;
    }

    let listener = TcpListener::bind(&server.config().listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let receiver = shutdown.subscribe();
    tokio::spawn(async move {
        signals::wait_for_signal().await;
        shutdown.trigger();
    });

    server.run(listener, receiver).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
