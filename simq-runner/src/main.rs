//! simq Runner
//!
//! Turns the durable job queue into a steady stream of remote simulations.
//!
//! Architecture:
//! - Configuration: command-line arguments with environment fallbacks
//! - Repositories: the SQLite job queue and the research API behind traits
//! - Scheduler: submission and collection loops paced by a shared backoff policy
//!
//! `submit` drains pending jobs, `collect` drives in-flight jobs to an
//! outcome, `run` does both at once. SIGINT/SIGTERM stop the loops between
//! attempts; in-flight jobs are picked up again by the next run.

mod cli;
mod config;
mod error;
mod repository;
mod scheduler;
mod shutdown;

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::{Cli, Command};
use crate::config::Config;
use crate::repository::{BrainRemoteClient, JobQueue, RemoteJobClient, SqliteJobQueue};
use crate::scheduler::{CollectionScheduler, SubmissionScheduler};
use simq_client::{BrainClient, ClientError};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "simq_runner=info,simq_client=info,simq_store=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = cli.to_config();
    config.validate().context("Invalid configuration")?;

    info!(
        "Starting simq runner: queue={}, api_url={}",
        config.queue_path.display(),
        config.api_url
    );

    let pool = simq_store::db::open(&config.queue_path)
        .await
        .with_context(|| format!("Failed to open queue {}", config.queue_path.display()))?;

    let client = BrainClient::new(config.api_url.clone(), config.credentials.clone())
        .context("Failed to build HTTP client")?;

    let shutdown = shutdown::install_shutdown_handler();

    sign_in_with_retry(&client, &shutdown).await?;

    let queue: Arc<dyn JobQueue> = Arc::new(SqliteJobQueue::new(pool));
    let remote: Arc<dyn RemoteJobClient> = Arc::new(BrainRemoteClient::new(client));

    match cli.command {
        Command::Submit => {
            SubmissionScheduler::new(config, queue, remote, shutdown)
                .run()
                .await;
        }
        Command::Collect => {
            CollectionScheduler::new(config, queue, remote, shutdown)
                .run()
                .await;
        }
        Command::Run => run_both(config, queue, remote, shutdown).await,
    }

    info!("Runner stopped");
    Ok(())
}

/// Runs submission and collection side by side
///
/// In batch mode the collector keeps going until the submitter has finished
/// and every job it submitted has been collected.
async fn run_both(
    config: Config,
    queue: Arc<dyn JobQueue>,
    remote: Arc<dyn RemoteJobClient>,
    shutdown: CancellationToken,
) {
    let submitted = CancellationToken::new();

    let submitter = SubmissionScheduler::new(
        config.clone(),
        Arc::clone(&queue),
        Arc::clone(&remote),
        shutdown.clone(),
    );
    let collector =
        CollectionScheduler::new(config, queue, remote, shutdown).with_upstream(submitted.clone());

    let submitting = async {
        let summary = submitter.run().await;
        submitted.cancel();
        summary
    };

    let (submissions, collections) = tokio::join!(submitting, collector.run());

    info!(
        "Submitted {} job(s) ({} failed), collected {} job(s) ({} failed)",
        submissions.succeeded, submissions.failed, collections.succeeded, collections.failed
    );
}

/// Sign in with retry logic and exponential backoff
///
/// Refused credentials fail at once; network trouble is retried so the
/// runner can start before the network is up.
async fn sign_in_with_retry(client: &BrainClient, shutdown: &CancellationToken) -> Result<()> {
    const MAX_RETRIES: u32 = 10;
    const INITIAL_DELAY_MS: u64 = 500;
    const MAX_DELAY_MS: u64 = 30_000;

    let mut attempt = 0;
    let mut delay_ms = INITIAL_DELAY_MS;

    loop {
        attempt += 1;

        match client.authenticate().await {
            Ok(()) => {
                if attempt > 1 {
                    info!("Signed in after {} attempt(s)", attempt);
                }
                return Ok(());
            }
            Err(e @ ClientError::Authentication { .. }) => {
                return Err(e).context("Sign-in refused, check the credentials");
            }
            Err(e) => {
                if attempt >= MAX_RETRIES {
                    error!("Failed to sign in after {} attempts", MAX_RETRIES);
                    return Err(e).context("Failed to sign in");
                }

                warn!(
                    "Failed to sign in (attempt {}/{}): {}",
                    attempt, MAX_RETRIES, e
                );
                warn!("Retrying in {} ms...", delay_ms);

                tokio::select! {
                    _ = shutdown.cancelled() => anyhow::bail!("Shutdown requested before sign-in"),
                    _ = tokio::time::sleep(Duration::from_millis(delay_ms)) => {}
                }

                // Exponential backoff with cap
                delay_ms = (delay_ms * 2).min(MAX_DELAY_MS);
            }
        }
    }
}
