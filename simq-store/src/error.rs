//! Store error types

use simq_core::domain::job::JobId;
use simq_core::domain::lifecycle::JobState;
use thiserror::Error;

/// Result type alias for store operations
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors raised by the durable queue
#[derive(Debug, Error)]
pub enum StoreError {
    /// The database could not be reached or rejected a statement
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("job {0} not found")]
    NotFound(JobId),

    /// The job is no longer in a state the requested transition starts from
    #[error("job {id} cannot move from {from} to {to}")]
    InvalidTransition {
        id: JobId,
        from: JobState,
        to: JobState,
    },

    /// A stored row could not be turned back into a domain value
    #[error("corrupt record: {0}")]
    Corrupt(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    /// Another writer advanced or removed the job first
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::InvalidTransition { .. } | Self::NotFound(_))
    }
}
