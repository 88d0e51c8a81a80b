//! Civ7 bridge entry point.

use civ7_bridge::{Bridge, serve};
use civ7_client::{DEFAULT_HOST, DEFAULT_PORT, ManagerConfig, SessionConfig, SessionManager};
use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Civ7 JSON-RPC bridge
#[derive(Parser, Debug)]
#[command(name = "civ7-bridge")]
#[command(about = "Expose the Civilization VII debug port to automation agents over stdio")]
#[command(version)]
struct Args {
    /// Debug port host
    #[arg(short = 'H', long, default_value = DEFAULT_HOST)]
    host: String,

    /// Debug port TCP port
    #[arg(short, long, default_value_t = DEFAULT_PORT, value_parser = clap::value_parser!(u16).range(1..))]
    port: u16,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // stdout carries protocol messages only.
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_ansi(false))
        .with(filter)
        .init();

    tracing::info!(host = %args.host, port = args.port, "civ7-bridge starting");

    let manager = SessionManager::new(ManagerConfig {
        share_endpoints: true,
        session: SessionConfig::from_env(),
    });
    let session = manager.open(&args.host, args.port);

    let result = serve(tokio::io::stdin(), tokio::io::stdout(), Bridge::new(session)).await;

    manager.shutdown().await;
    tracing::info!("civ7-bridge exiting");
    result.map_err(Into::into)
}
