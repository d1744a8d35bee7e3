//! # Telemetry Relay
//!
//! Polls a local flight-data source for its XML status document and forwards
//! altitude and roll to a remote collector as JSON telemetry events.
//!
//! # Control Flow
//!
//! 1. **Initialization**
//!    - Parse command line, load and validate the TOML configuration
//!    - Set up logging (console, optional rolling file)
//!    - Build the HTTP source and collector clients
//!
//! 2. **Main Loop**
//!    - Poll the source at 10Hz
//!    - Decode, encode and hand each event to the dispatcher
//!    - Deliver one event at a time, re-queueing failures
//!
//! 3. **Graceful Shutdown**
//!    - Ctrl+C or SIGTERM stops the loop
//!    - Totals and the number of undelivered events are logged
//!
//! Expected output:
//! ```text
//! INFO telemetry_relay: Telemetry Relay v0.1.0 starting...
//! INFO telemetry_relay::config: Configuration accepted
//! INFO telemetry_relay::relay: Polling source at 10Hz
//! INFO telemetry_relay::relay: Delivered 100 events (100 polls, 0 parse failures, ...)
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use telemetry_relay::config::Config;
use telemetry_relay::logging;
use telemetry_relay::relay::Relay;
use telemetry_relay::transport::{HttpSink, HttpSource};

/// Relay flight status from a local XML source to a remote JSON collector
#[derive(Debug, Parser)]
#[command(name = "telemetry-relay", version, about)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, env = "TELEMETRY_RELAY_CONFIG", default_value = "config.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::load(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;

    let _log_guard = logging::init(&config.logging);

    info!("Telemetry Relay v{} starting...", env!("CARGO_PKG_VERSION"));
    config.log_summary();

    let identity = config.identity();

    let source = HttpSource::new(
        &identity.source_endpoint,
        Duration::from_millis(config.source.timeout_ms),
    )
    .context("Failed to create source client")?;

    let sink = HttpSink::new(
        &identity.dest_endpoint,
        Duration::from_millis(config.destination.timeout_ms),
    )
    .context("Failed to create collector client")?;

    let relay = Relay::new(
        Arc::clone(&identity),
        Arc::new(source),
        Arc::new(sink),
        config.destination.ordering,
    );

    info!("Press Ctrl+C to exit");
    relay.run(shutdown_signal()).await;

    info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
        _ = terminate => info!("Received SIGTERM, shutting down..."),
    }
}
