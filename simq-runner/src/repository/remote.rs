//! Remote job repository
//!
//! Submits jobs to the research API and polls them. Session expiry is
//! handled inside [`BrainClient`]; callers only see the outcome.

use async_trait::async_trait;
use simq_client::{BrainClient, SimulationProgress};
use simq_core::domain::alpha::Alpha;
use simq_core::domain::job::Job;
use simq_core::dto::simulation::SimulationRequest;
use std::time::Duration;

use crate::error::RemoteError;

/// Where a remote job stands
#[derive(Debug, Clone, PartialEq)]
pub enum PollStatus {
    /// Still running; the server may say how long to wait
    Pending { retry_after: Option<Duration> },
    /// Finished and produced an artifact
    Complete { artifact_id: String },
    /// Finished without an artifact
    PermanentFailure { reason: String },
}

impl From<SimulationProgress> for PollStatus {
    fn from(progress: SimulationProgress) -> Self {
        match progress {
            SimulationProgress::InProgress { retry_after } => Self::Pending { retry_after },
            SimulationProgress::Complete { alpha_id } => Self::Complete {
                artifact_id: alpha_id,
            },
            SimulationProgress::Failed { message } => Self::PermanentFailure { reason: message },
        }
    }
}

/// Repository trait for remote job operations
#[async_trait]
pub trait RemoteJobClient: Send + Sync {
    /// Submits a job for asynchronous evaluation
    ///
    /// # Returns
    /// The remote handle used to poll the job
    async fn submit(&self, job: &Job) -> Result<String, RemoteError>;

    /// Asks how a submitted job is doing
    ///
    /// # Arguments
    /// * `remote_handle` - Handle returned by [`RemoteJobClient::submit`]
    async fn poll(&self, remote_handle: &str) -> Result<PollStatus, RemoteError>;

    /// Fetches the artifact a completed job produced
    async fn fetch_artifact(&self, artifact_id: &str) -> Result<Alpha, RemoteError>;
}

/// HTTP implementation of RemoteJobClient
pub struct BrainRemoteClient {
    client: BrainClient,
}

impl BrainRemoteClient {
    pub fn new(client: BrainClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl RemoteJobClient for BrainRemoteClient {
    async fn submit(&self, job: &Job) -> Result<String, RemoteError> {
        let request = SimulationRequest::for_job(job);
        Ok(self.client.submit_simulation(&request).await?)
    }

    async fn poll(&self, remote_handle: &str) -> Result<PollStatus, RemoteError> {
        let progress = self.client.simulation_progress(remote_handle).await?;
        Ok(progress.into())
    }

    async fn fetch_artifact(&self, artifact_id: &str) -> Result<Alpha, RemoteError> {
        Ok(self.client.get_alpha(artifact_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_maps_to_poll_status() {
        let hint = Some(Duration::from_secs(5));
        assert_eq!(
            PollStatus::from(SimulationProgress::InProgress { retry_after: hint }),
            PollStatus::Pending { retry_after: hint }
        );
        assert_eq!(
            PollStatus::from(SimulationProgress::Complete {
                alpha_id: "w2zl935".to_string()
            }),
            PollStatus::Complete {
                artifact_id: "w2zl935".to_string()
            }
        );
        assert_eq!(
            PollStatus::from(SimulationProgress::Failed {
                message: "unknown variable".to_string()
            }),
            PollStatus::PermanentFailure {
                reason: "unknown variable".to_string()
            }
        );
    }
}
