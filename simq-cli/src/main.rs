//! simq CLI
//!
//! Operator interface to the simulation queue: enqueue expressions, inspect
//! job states and maintain the data-field catalog.

mod commands;
mod config;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, handle_command};
use config::Config;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "simq")]
#[command(about = "Simulation queue CLI", long_about = None)]
struct Cli {
    /// SQLite file holding the job queue
    #[arg(long, env = "SIMQ_QUEUE_PATH", default_value = "alpha.db")]
    queue_path: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "simq_client=warn,simq_store=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let config = Config {
        queue_path: cli.queue_path,
    };

    handle_command(cli.command, &config).await
}
