//! Configuration module
//!
//! Handles CLI configuration and opening the queue it points at.

use anyhow::{Context, Result};
use simq_store::SqlitePool;
use std::path::PathBuf;

/// CLI configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// SQLite file holding the job queue
    pub queue_path: PathBuf,
}

impl Config {
    /// Open the queue, creating it on first use
    pub async fn open_queue(&self) -> Result<SqlitePool> {
        simq_store::db::open(&self.queue_path)
            .await
            .with_context(|| format!("Failed to open queue {}", self.queue_path.display()))
    }
}
