//! Runner configuration
//!
//! Defines all configurable parameters for the schedulers including
//! the queue location, remote API connection and pacing limits.

use simq_client::{Credentials, DEFAULT_API_URL};
use std::path::PathBuf;
use std::time::Duration;

use crate::scheduler::backoff::BackoffPolicy;

/// Default queue file
pub const DEFAULT_QUEUE_PATH: &str = "alpha.db";

/// Runner configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// SQLite file holding the job queue
    pub queue_path: PathBuf,

    /// Research API base URL (e.g., "https://api.worldquantbrain.com")
    pub api_url: String,

    pub credentials: Credentials,

    /// Jobs to drive to an outcome before stopping; 0 means no limit
    pub max_jobs: u64,

    /// How long to wait before rescanning an empty queue in watch mode
    pub scan_interval: Duration,

    /// Keep scanning after the queue runs dry
    pub watch: bool,

    /// In-flight jobs polled at the same time
    pub max_concurrent_polls: usize,

    /// Consecutive poll failures tolerated before a job is failed
    pub max_poll_failures: u32,

    /// Consecutive protocol errors tolerated while submitting one job
    pub max_protocol_errors: u32,

    pub backoff: BackoffPolicy,
}

impl Config {
    /// Creates a new configuration with defaults
    pub fn new(credentials: Credentials) -> Self {
        Self {
            queue_path: PathBuf::from(DEFAULT_QUEUE_PATH),
            api_url: DEFAULT_API_URL.to_string(),
            credentials,
            max_jobs: 0,
            scan_interval: Duration::from_secs(5),
            watch: false,
            max_concurrent_polls: 4,
            max_poll_failures: 3,
            max_protocol_errors: 5,
            backoff: BackoffPolicy::default(),
        }
    }

    /// Job limit, if any
    pub fn job_limit(&self) -> Option<u64> {
        (self.max_jobs > 0).then_some(self.max_jobs)
    }

    /// Validates the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.credentials.user.is_empty() {
            anyhow::bail!("user cannot be empty");
        }

        if self.credentials.password.is_empty() {
            anyhow::bail!("password cannot be empty");
        }

        if self.api_url.is_empty() {
            anyhow::bail!("api_url cannot be empty");
        }

        if !self.api_url.starts_with("http://") && !self.api_url.starts_with("https://") {
            anyhow::bail!("api_url must start with http:// or https://");
        }

        if self.queue_path.as_os_str().is_empty() {
            anyhow::bail!("queue_path cannot be empty");
        }

        if self.scan_interval.is_zero() {
            anyhow::bail!("scan_interval must be greater than 0");
        }

        if self.max_concurrent_polls == 0 {
            anyhow::bail!("max_concurrent_polls must be greater than 0");
        }

        self.backoff.validate()?;

        Ok(())
    }
}
