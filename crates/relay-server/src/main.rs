//! relayd: trigger daemon entrypoint.

use anyhow::{Context, Result};
use clap::Parser;
use relay_server::{Relay, RelayConfig};
use std::path::PathBuf;
use tokio::io::BufReader;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "relayd")]
#[command(author, version, about = "Relay pipeline trigger daemon", long_about = None)]
struct Cli {
    /// YAML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Do not read events from stdin; only poll and wait for Ctrl-C.
    #[arg(long)]
    no_stdin: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let dotenv = dotenvy::dotenv();
    let cli = Cli::parse();

    let config = RelayConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    relay_trace::init_tracer(&config.tracing).context("Failed to initialize tracing")?;
    if let Ok(path) = dotenv {
        info!(path = %path.display(), "Loaded environment file");
    }

    let relay = Relay::from_config(&config).context("Failed to build relay")?;
    relay.start();

    if cli.no_stdin {
        tokio::signal::ctrl_c().await?;
        info!("Received Ctrl-C");
    } else {
        let stdin = BufReader::new(tokio::io::stdin());
        tokio::select! {
            stats = relay.ingest(stdin) => {
                let stats = stats.context("Failed to read events from stdin")?;
                info!(
                    lines = stats.lines,
                    dispatched = stats.dispatched,
                    rejected = stats.rejected,
                    "Reached end of input"
                );
            }
            signal = tokio::signal::ctrl_c() => {
                if let Err(e) = signal {
                    warn!(error = %e, "Failed to listen for Ctrl-C");
                }
                info!("Received Ctrl-C");
            }
        }
    }

    relay.shutdown().await;
    relay_trace::shutdown_tracer();
    Ok(())
}
