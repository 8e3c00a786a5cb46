//! Command-line interface

use clap::{Parser, Subcommand};
use simq_client::{Credentials, DEFAULT_API_URL};
use std::path::PathBuf;
use std::time::Duration;

use crate::config::{Config, DEFAULT_QUEUE_PATH};

#[derive(Parser)]
#[command(name = "simq-runner")]
#[command(about = "Submit queued simulations and collect their results", long_about = None)]
#[command(version)]
pub struct Cli {
    /// SQLite file holding the job queue
    #[arg(long, env = "SIMQ_QUEUE_PATH", default_value = DEFAULT_QUEUE_PATH)]
    pub queue_path: PathBuf,

    /// Account used to sign in to the research API
    #[arg(long, env = "WQB_USER")]
    pub user: String,

    #[arg(long, env = "WQB_PASS", hide_env_values = true)]
    pub password: String,

    /// Research API base URL
    #[arg(long, env = "SIMQ_API_URL", default_value = DEFAULT_API_URL)]
    pub api_url: String,

    /// Stop after this many jobs reached an outcome (0 = no limit)
    #[arg(long, default_value_t = 0)]
    pub max_jobs: u64,

    /// Seconds between scans of an empty queue in watch mode
    #[arg(long, default_value_t = 5)]
    pub scan_interval: u64,

    /// Keep running and rescan when the queue is empty
    #[arg(long)]
    pub watch: bool,

    /// In-flight jobs polled at the same time
    #[arg(long, default_value_t = 4)]
    pub concurrency: usize,

    /// Consecutive poll failures before an in-flight job is failed
    #[arg(long, default_value_t = 3)]
    pub max_poll_failures: u32,

    /// Consecutive protocol errors before a pending job is failed
    #[arg(long, default_value_t = 5)]
    pub max_protocol_errors: u32,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    /// Submit pending jobs
    Submit,
    /// Collect results of in-flight jobs
    Collect,
    /// Submit and collect at the same time
    Run,
}

impl Cli {
    /// Builds the runner configuration from the parsed arguments
    pub fn to_config(&self) -> Config {
        let mut config = Config::new(Credentials::new(&self.user, &self.password));
        config.queue_path = self.queue_path.clone();
        config.api_url = self.api_url.clone();
        config.max_jobs = self.max_jobs;
        config.scan_interval = Duration::from_secs(self.scan_interval);
        config.watch = self.watch;
        config.max_concurrent_polls = self.concurrency;
        config.max_poll_failures = self.max_poll_failures;
        config.max_protocol_errors = self.max_protocol_errors;
        config
    }
}
