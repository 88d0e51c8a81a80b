//! Civ7 debug terminal entry point.

use std::{fs::File, path::PathBuf, sync::Arc};

use civ7_client::{DEFAULT_HOST, DEFAULT_PORT, SessionConfig};
use civ7_tui::{Runtime, TuiConfig};
use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// File under the session directory that receives diagnostics.
const LOG_FILE: &str = "civ7-tui.log";

/// Civ7 debug terminal
#[derive(Parser, Debug)]
#[command(name = "civ7-tui")]
#[command(about = "Interactive terminal for the Civilization VII debug port")]
#[command(version)]
struct Args {
    /// Debug port host
    #[arg(short = 'H', long, default_value = DEFAULT_HOST)]
    host: String,

    /// Debug port TCP port
    #[arg(short, long, default_value_t = DEFAULT_PORT, value_parser = clap::value_parser!(u16).range(1..))]
    port: u16,

    /// Directory for session logs
    #[arg(short, long, default_value = "./sessions")]
    session_dir: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // The terminal owns stdout, so diagnostics go to a file.
    std::fs::create_dir_all(&args.session_dir)?;
    let log_file = File::create(args.session_dir.join(LOG_FILE))?;
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(Arc::new(log_file)).with_ansi(false))
        .with(filter)
        .init();

    tracing::info!(host = %args.host, port = args.port, "civ7-tui starting");

    let config = TuiConfig {
        host: args.host,
        port: args.port,
        session_dir: args.session_dir,
        session: SessionConfig::from_env(),
    };

    Runtime::new(config)?.run().await?;

    tracing::info!("civ7-tui exiting");
    Ok(())
}
