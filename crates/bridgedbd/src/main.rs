//! bridgedbd — the BridgeDB daemon.
//!
//! Composition root for the request parser and the metrics subsystem:
//! - Configuration (bridgedb.toml)
//! - Supported transports registry
//! - Per-channel metrics + periodic rotation/export
//!
//! # Usage
//!
//! ```text
//! bridgedbd serve --config /etc/bridgedb/bridgedb.toml
//! bridgedbd parse --channel email < message.eml
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tokio::sync::watch;
use tracing::info;

use bridgedb_core::BridgeDbConfig;
use bridgedb_metrics::MetricsRegistry;

mod commands;

use commands::InputChannel;

#[derive(Parser)]
#[command(name = "bridgedbd", about = "BridgeDB daemon", version)]
struct Cli {
    /// Path to bridgedb.toml. Built-in defaults are used when omitted.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the metrics rotation loop until interrupted.
    Serve {
        /// Rotation interval in seconds (overrides the config file).
        #[arg(long)]
        interval: Option<u64>,

        /// Export file (overrides the config file).
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Parse a bridge request read from stdin and print it as JSON.
    Parse {
        /// How to interpret stdin: a raw email, or an HTTPS query string.
        #[arg(long, value_enum, default_value = "email")]
        channel: InputChannel,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,bridgedb=debug")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => BridgeDbConfig::from_file(path)?,
        None => BridgeDbConfig::default(),
    };

    match cli.command {
        Command::Serve { interval, output } => run_serve(config, interval, output).await,
        Command::Parse { channel } => {
            let input = std::io::read_to_string(std::io::stdin())?;
            let output = commands::parse_input(channel, &input, &config.transport_registry());
            println!("{}", serde_json::to_string_pretty(&output)?);
            Ok(())
        }
    }
}

async fn run_serve(
    config: BridgeDbConfig,
    interval: Option<u64>,
    output: Option<PathBuf>,
) -> anyhow::Result<()> {
    info!("BridgeDB daemon starting");

    let interval = interval
        .map(Duration::from_secs)
        .unwrap_or_else(|| config.metrics_interval());
    anyhow::ensure!(!interval.is_zero(), "metrics interval must be greater than zero");
    let output = output.unwrap_or_else(|| config.metrics.output.clone());

    // ── Initialize subsystems ──────────────────────────────────

    let transports = config.transport_registry();
    info!(
        supported = transports.supported().values().filter(|on| **on).count(),
        "supported transports loaded"
    );

    let metrics = Arc::new(MetricsRegistry::new(transports));
    info!(interval_secs = interval.as_secs(), "metrics registry initialized");

    // ── Shutdown signal ────────────────────────────────────────

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // ── Start background tasks ─────────────────────────────────

    let rotation = metrics.clone();
    let metrics_handle = tokio::spawn(async move {
        rotation.run(interval, output, shutdown_rx).await;
    });

    tokio::signal::ctrl_c().await?;
    info!("shutdown signal received");
    let _ = shutdown_tx.send(true);

    let _ = metrics_handle.await;

    info!("BridgeDB daemon stopped");
    Ok(())
}
