//! Job lifecycle state machine
//!
//! ```text
//! PENDING ──► IN_FLIGHT ──► DONE
//!    │            │
//!    └────────────┴───────► FAILED
//! ```
//!
//! `DONE` and `FAILED` are terminal. Nothing re-enters `PENDING`; a failed job
//! can only be recovered by an operator outside this system.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Lifecycle state of a queued job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobState {
    /// Queued locally, not yet accepted by the remote API
    Pending,
    /// Accepted by the remote API, result not collected yet
    InFlight,
    /// Result collected and persisted
    Done,
    /// Gave up on the job
    Failed,
}

/// Errors raised by the lifecycle state machine
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LifecycleError {
    #[error("illegal job transition {from} -> {to}")]
    IllegalTransition { from: JobState, to: JobState },

    #[error("unknown job state: {0}")]
    UnknownState(String),
}

impl JobState {
    /// All states, in lifecycle order
    pub const ALL: [JobState; 4] = [
        JobState::Pending,
        JobState::InFlight,
        JobState::Done,
        JobState::Failed,
    ];

    /// Persisted representation
    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Pending => "PENDING",
            JobState::InFlight => "IN_FLIGHT",
            JobState::Done => "DONE",
            JobState::Failed => "FAILED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Done | JobState::Failed)
    }

    /// States a job may be in right before entering `self`
    ///
    /// The store uses this to build its conditional updates, so the rule lives
    /// in exactly one place.
    pub fn predecessors(&self) -> &'static [JobState] {
        match self {
            JobState::Pending => &[],
            JobState::InFlight => &[JobState::Pending],
            JobState::Done => &[JobState::InFlight],
            JobState::Failed => &[JobState::Pending, JobState::InFlight],
        }
    }

    pub fn can_transition_to(&self, next: JobState) -> bool {
        next.predecessors().contains(self)
    }

    /// Validates a transition and returns the new state
    pub fn transition_to(self, next: JobState) -> Result<JobState, LifecycleError> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(LifecycleError::IllegalTransition {
                from: self,
                to: next,
            })
        }
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobState {
    type Err = LifecycleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "PENDING" => Ok(JobState::Pending),
            "IN_FLIGHT" | "IN-FLIGHT" | "INFLIGHT" => Ok(JobState::InFlight),
            "DONE" => Ok(JobState::Done),
            "FAILED" => Ok(JobState::Failed),
            _ => Err(LifecycleError::UnknownState(s.to_string())),
        }
    }
}
