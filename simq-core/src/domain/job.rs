//! Job domain types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::lifecycle::JobState;

/// Local identifier of a queued job (the queue's primary key)
pub type JobId = i64;

/// A queued simulation
///
/// Structure shared between the store (persists) and the schedulers (advance it).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    /// Expression to simulate, sent verbatim
    pub expression: String,
    /// Simulation type, e.g. `REGULAR`
    pub job_type: String,
    /// Setting overrides merged over the remote defaults
    pub settings: serde_json::Value,
    pub state: JobState,
    /// Progress location returned by the remote API on submission
    pub remote_handle: Option<String>,
    /// Alpha produced by a completed simulation
    pub artifact_id: Option<String>,
    /// Diagnostic recorded when the job failed
    pub failure_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Job {
    /// Short form of the expression for single-line output
    pub fn short_expression(&self, max: usize) -> String {
        if self.expression.chars().count() <= max {
            return self.expression.clone();
        }
        let keep = max.saturating_sub(3);
        let mut short: String = self.expression.chars().take(keep).collect();
        short.push_str("...");
        short
    }
}

/// Request to put a new expression on the queue
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewJob {
    pub expression: String,
    pub job_type: String,
    pub settings: serde_json::Value,
}

impl NewJob {
    /// A `REGULAR` simulation with no setting overrides
    pub fn regular(expression: impl Into<String>) -> Self {
        Self {
            expression: expression.into(),
            job_type: DEFAULT_JOB_TYPE.to_string(),
            settings: serde_json::Value::Object(Default::default()),
        }
    }
}

pub const DEFAULT_JOB_TYPE: &str = "REGULAR";

/// Number of jobs per lifecycle state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateCounts {
    pub pending: u64,
    pub in_flight: u64,
    pub done: u64,
    pub failed: u64,
}

impl StateCounts {
    pub fn get(&self, state: JobState) -> u64 {
        match state {
            JobState::Pending => self.pending,
            JobState::InFlight => self.in_flight,
            JobState::Done => self.done,
            JobState::Failed => self.failed,
        }
    }

    pub fn set(&mut self, state: JobState, count: u64) {
        match state {
            JobState::Pending => self.pending = count,
            JobState::InFlight => self.in_flight = count,
            JobState::Done => self.done = count,
            JobState::Failed => self.failed = count,
        }
    }

    pub fn total(&self) -> u64 {
        self.pending + self.in_flight + self.done + self.failed
    }
}
