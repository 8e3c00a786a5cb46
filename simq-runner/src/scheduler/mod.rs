//! Scheduler layer for the runner
//!
//! Two structurally symmetric loops drive jobs through their lifecycle:
//! the submission scheduler moves `PENDING` jobs to `IN_FLIGHT`, the
//! collection scheduler moves `IN_FLIGHT` jobs to `DONE` or `FAILED`.
//! Both pace themselves with the backoff controller and stop between
//! attempts when the shutdown token is cancelled.

pub mod backoff;
pub mod collector;
pub mod progress;
pub mod submitter;

#[cfg(test)]
mod testing;

pub use collector::CollectionScheduler;
pub use submitter::SubmissionScheduler;

use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Jobs a scheduler run drove to an outcome
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub succeeded: u64,
    pub failed: u64,
}

impl RunSummary {
    pub fn total(&self) -> u64 {
        self.succeeded + self.failed
    }
}

/// Sleeps for `wait` unless shutdown comes first
///
/// # Returns
/// `false` if the sleep was cut short by shutdown
pub(crate) async fn pause(shutdown: &CancellationToken, wait: Duration) -> bool {
    tokio::select! {
        _ = shutdown.cancelled() => false,
        _ = tokio::time::sleep(wait) => true,
    }
}

/// Whether `handled` jobs exhaust `limit`
pub(crate) fn limit_reached(limit: Option<u64>, handled: u64) -> bool {
    limit.is_some_and(|limit| handled >= limit)
}
