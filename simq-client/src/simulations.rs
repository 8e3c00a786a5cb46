//! Simulation endpoints

use reqwest::Response;
use reqwest::header::{HeaderMap, LOCATION, RETRY_AFTER};
use simq_core::dto::simulation::{SimulationRequest, SimulationStatus};
use std::time::Duration;

use crate::BrainClient;
use crate::error::{ClientError, Result};

/// Where a submitted simulation stands
#[derive(Debug, Clone, PartialEq)]
pub enum SimulationProgress {
    /// Still running; the server may say when to ask again
    InProgress { retry_after: Option<Duration> },
    /// Finished and produced an alpha
    Complete { alpha_id: String },
    /// The server gave up on the simulation
    Failed { message: String },
}

impl BrainClient {
    // =============================================================================
    // Simulations
    // =============================================================================

    /// Submit a simulation
    ///
    /// # Returns
    /// The progress location to poll, taken from the `Location` header
    pub async fn submit_simulation(&self, request: &SimulationRequest) -> Result<String> {
        let url = self.url("simulations");
        let response = self.send(self.client.post(&url).json(request)).await?;
        let response = self.check_status(response).await?;

        location(response.headers())
    }

    /// Ask how a submitted simulation is doing
    ///
    /// # Arguments
    /// * `handle` - Progress location returned by [`BrainClient::submit_simulation`]
    pub async fn simulation_progress(&self, handle: &str) -> Result<SimulationProgress> {
        let url = self.url(handle);
        let response = self.send(self.client.get(&url)).await?;
        let response = self.check_status(response).await?;

        if let Some(retry_after) = retry_after(response.headers())? {
            return Ok(SimulationProgress::InProgress {
                retry_after: Some(retry_after),
            });
        }

        let status = parse_status(response).await?;
        Ok(progress_from_status(status))
    }
}

fn location(headers: &HeaderMap) -> Result<String> {
    let value = headers
        .get(LOCATION)
        .ok_or(ClientError::MissingHeader("Location"))?;

    value
        .to_str()
        .map(str::to_string)
        .map_err(|e| ClientError::ParseError(format!("Invalid Location header: {}", e)))
}

/// `Retry-After` in seconds; fractional values are accepted
///
/// Negative, non-finite or out-of-range values are protocol errors.
pub(crate) fn retry_after(headers: &HeaderMap) -> Result<Option<Duration>> {
    let Some(value) = headers.get(RETRY_AFTER) else {
        return Ok(None);
    };

    let seconds = value
        .to_str()
        .ok()
        .and_then(|s| s.trim().parse::<f64>().ok())
        .ok_or_else(|| ClientError::ParseError(format!("Invalid Retry-After header: {:?}", value)))?;

    Duration::try_from_secs_f64(seconds)
        .map(Some)
        .map_err(|e| ClientError::ParseError(format!("Invalid Retry-After header {:?}: {}", value, e)))
}

async fn parse_status(response: Response) -> Result<SimulationStatus> {
    response
        .json()
        .await
        .map_err(|e| ClientError::ParseError(format!("Failed to parse simulation status: {}", e)))
}

fn progress_from_status(status: SimulationStatus) -> SimulationProgress {
    if let Some(alpha_id) = status.alpha.clone() {
        return SimulationProgress::Complete { alpha_id };
    }

    if status.is_failed() {
        let message = status
            .message
            .unwrap_or_else(|| format!("simulation ended with status {}", status.status.unwrap_or_default()));
        return SimulationProgress::Failed { message };
    }

    SimulationProgress::InProgress { retry_after: None }
}
