//! Error types seen by the schedulers
//!
//! The schedulers only care about how to react to a failure, so transport
//! and storage errors are folded into two small enums at the adapter seam.

use simq_client::ClientError;
use simq_core::domain::job::JobId;
use simq_store::StoreError;
use std::time::Duration;
use thiserror::Error;

/// Failure talking to the remote research API
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    /// Network trouble, server error or rate limiting; retry later
    #[error("transient failure: {0}")]
    Transient(String),

    /// The session could not be renewed
    #[error("authentication failed: {0}")]
    Auth(String),

    /// The server refused the job itself; retrying cannot help
    #[error("rejected by server: {0}")]
    Rejected(String),

    /// The response could not be understood
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The server is throttling; it may say how long to back off
    #[error("rate limited: {message}")]
    RateLimited {
        retry_after: Option<Duration>,
        message: String,
    },
}

impl RemoteError {
    /// Wait requested by the server, overriding the local backoff
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimited { retry_after, .. } => *retry_after,
            _ => None,
        }
    }
}

impl From<ClientError> for RemoteError {
    fn from(err: ClientError) -> Self {
        let message = err.to_string();
        if matches!(err, ClientError::Authentication { .. }) {
            Self::Auth(message)
        } else if err.is_protocol() {
            Self::Protocol(message)
        } else if err.is_rejected() {
            Self::Rejected(message)
        } else if let ClientError::RateLimited { retry_after, .. } = err {
            Self::RateLimited {
                retry_after,
                message,
            }
        } else {
            Self::Transient(message)
        }
    }
}

/// Failure reading or writing the durable queue
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueueError {
    /// The store could not be reached; the write may be retried
    #[error("storage error: {0}")]
    Storage(String),

    /// The job is not in a state the transition starts from
    #[error("job {id} was already advanced: {message}")]
    Conflict { id: JobId, message: String },
}

impl From<StoreError> for QueueError {
    fn from(err: StoreError) -> Self {
        match &err {
            StoreError::InvalidTransition { id, .. } => Self::Conflict {
                id: *id,
                message: err.to_string(),
            },
            StoreError::NotFound(id) => Self::Conflict {
                id: *id,
                message: err.to_string(),
            },
            _ => Self::Storage(err.to_string()),
        }
    }
}
