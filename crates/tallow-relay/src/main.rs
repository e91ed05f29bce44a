//! Process entry point: parse the CLI, resolve configuration, and hand
//! off to [`tallow_relay::run`] for whichever surface `--mode` selects.

use clap::Parser;
use tracing::error;

use tallow_relay::cli::Cli;
use tallow_relay::{config, logging};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = config::load(&cli)?;
    logging::init(&cfg.log_level, &cfg.log_format);

    if let Err(err) = tallow_relay::run(cfg).await {
        error!(error = %err, "fatal error during startup");
        std::process::exit(1);
    }
    Ok(())
}
