//! Job queue repository
//!
//! The schedulers read pending and in-flight work and persist every
//! lifecycle transition through this trait. Each transition is atomic per
//! job: if the job is no longer in a state the transition starts from, the
//! call fails with [`QueueError::Conflict`] and nothing is written.

use async_trait::async_trait;
use simq_core::domain::alpha::Alpha;
use simq_core::domain::job::{Job, JobId};
use simq_core::domain::lifecycle::JobState;
use simq_store::SqlitePool;
use simq_store::repository::{alpha_repository, simulation_repository};

use crate::error::QueueError;

/// Repository trait for the durable job queue
#[async_trait]
pub trait JobQueue: Send + Sync {
    /// Jobs waiting for submission, in insertion order
    async fn list_pending(&self) -> Result<Vec<Job>, QueueError>;

    /// Jobs submitted and not yet collected
    async fn list_in_flight(&self) -> Result<Vec<Job>, QueueError>;

    /// Moves a job to `IN_FLIGHT` and records its remote handle
    ///
    /// # Arguments
    /// * `id` - The job that was submitted
    /// * `remote_handle` - Handle returned by the remote API
    async fn mark_submitted(&self, id: JobId, remote_handle: &str) -> Result<(), QueueError>;

    /// Moves a job to `DONE` and records the produced artifact
    async fn mark_done(&self, id: JobId, artifact_id: &str) -> Result<(), QueueError>;

    /// Moves a job to `FAILED` with a diagnostic
    async fn mark_failed(&self, id: JobId, reason: &str) -> Result<(), QueueError>;

    /// Persists a collected artifact; saving the same artifact twice is harmless
    async fn save_artifact(&self, alpha: &Alpha) -> Result<(), QueueError>;
}

/// SQLite implementation of JobQueue
pub struct SqliteJobQueue {
    pool: SqlitePool,
}

impl SqliteJobQueue {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl JobQueue for SqliteJobQueue {
    async fn list_pending(&self) -> Result<Vec<Job>, QueueError> {
        Ok(simulation_repository::find_by_state(&self.pool, JobState::Pending, None).await?)
    }

    async fn list_in_flight(&self) -> Result<Vec<Job>, QueueError> {
        Ok(simulation_repository::find_by_state(&self.pool, JobState::InFlight, None).await?)
    }

    async fn mark_submitted(&self, id: JobId, remote_handle: &str) -> Result<(), QueueError> {
        Ok(simulation_repository::mark_submitted(&self.pool, id, remote_handle).await?)
    }

    async fn mark_done(&self, id: JobId, artifact_id: &str) -> Result<(), QueueError> {
        Ok(simulation_repository::mark_done(&self.pool, id, artifact_id).await?)
    }

    async fn mark_failed(&self, id: JobId, reason: &str) -> Result<(), QueueError> {
        Ok(simulation_repository::mark_failed(&self.pool, id, reason).await?)
    }

    async fn save_artifact(&self, alpha: &Alpha) -> Result<(), QueueError> {
        Ok(alpha_repository::save(&self.pool, alpha).await?)
    }
}
