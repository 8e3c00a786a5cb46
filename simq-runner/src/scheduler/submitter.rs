//! Submission scheduler
//!
//! Drains `PENDING` jobs in insertion order, submits each to the remote API
//! and records the returned handle, moving the job to `IN_FLIGHT`.
//!
//! A job is retried until the server accepts or rejects it. Transient
//! failures leave it `PENDING` and grow the wait; a rejected payload fails
//! the job at once. Protocol errors are retried too, but only a bounded
//! number of times in a row.
//!
//! The handle is persisted only after the server confirmed the submission.
//! If the process dies in between, the remote job is orphaned and the local
//! job is submitted again on the next run.

use simq_core::domain::job::Job;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::backoff::SharedBackoff;
use super::progress::{Progress, job_line, secs};
use super::{RunSummary, limit_reached, pause};
use crate::config::Config;
use crate::error::{QueueError, RemoteError};
use crate::repository::{JobQueue, RemoteJobClient};

/// What became of one pending job
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Submitted {
    InFlight,
    Failed,
    /// Another worker advanced the job first
    Skipped,
    Interrupted,
}

/// Moves pending jobs to the remote API
pub struct SubmissionScheduler {
    config: Config,
    queue: Arc<dyn JobQueue>,
    remote: Arc<dyn RemoteJobClient>,
    backoff: SharedBackoff,
    progress: Progress,
    shutdown: CancellationToken,
}

impl SubmissionScheduler {
    /// Creates a new submission scheduler
    pub fn new(
        config: Config,
        queue: Arc<dyn JobQueue>,
        remote: Arc<dyn RemoteJobClient>,
        shutdown: CancellationToken,
    ) -> Self {
        let backoff = SharedBackoff::new(config.backoff);
        Self {
            config,
            queue,
            remote,
            backoff,
            progress: Progress::new(),
            shutdown,
        }
    }

    #[cfg(test)]
    pub fn backoff(&self) -> &SharedBackoff {
        &self.backoff
    }

    /// Runs until the queue is drained, the job limit is hit or shutdown
    ///
    /// In watch mode an empty queue is rescanned every `scan_interval`
    /// instead of ending the run.
    pub async fn run(&self) -> RunSummary {
        info!(
            "Starting submission scheduler (limit: {:?}, watch: {})",
            self.config.job_limit(),
            self.config.watch
        );

        let mut summary = RunSummary::default();

        'scan: while !self.shutdown.is_cancelled()
            && !limit_reached(self.config.job_limit(), summary.total())
        {
            let jobs = match self.queue.list_pending().await {
                Ok(jobs) => jobs,
                Err(e) => {
                    let wait = self.backoff.on_failure().await;
                    error!("Failed to list pending jobs: {}", e);
                    self.progress
                        .note(&format!("Queue unavailable. Rescan after {}.", secs(wait)));
                    if !pause(&self.shutdown, wait).await {
                        break;
                    }
                    continue;
                }
            };

            if jobs.is_empty() {
                if !self.config.watch {
                    info!("No pending jobs left");
                    break;
                }
                debug!("No pending jobs, rescanning in {:?}", self.config.scan_interval);
                if !pause(&self.shutdown, self.config.scan_interval).await {
                    break;
                }
                continue;
            }

            info!("Found {} pending job(s)", jobs.len());

            for job in jobs {
                if limit_reached(self.config.job_limit(), summary.total()) {
                    info!("Job limit reached");
                    break 'scan;
                }

                match self.submit_job(&job).await {
                    Submitted::InFlight => summary.succeeded += 1,
                    Submitted::Failed => summary.failed += 1,
                    Submitted::Skipped => {}
                    Submitted::Interrupted => break 'scan,
                }
            }
        }

        info!(
            "Submission scheduler stopped: {} submitted, {} failed",
            summary.succeeded, summary.failed
        );
        summary
    }

    /// Submits one job until the server accepts or rejects it
    async fn submit_job(&self, job: &Job) -> Submitted {
        let label = job.short_expression(50);
        let mut protocol_errors = 0u32;

        loop {
            if self.shutdown.is_cancelled() {
                return Submitted::Interrupted;
            }

            let err = match self.remote.submit(job).await {
                Ok(handle) => return self.record_submission(job, &label, &handle).await,
                Err(RemoteError::Rejected(reason)) => {
                    return self.fail(job, &label, &reason).await;
                }
                Err(err) => err,
            };

            if let RemoteError::Protocol(message) = &err {
                protocol_errors += 1;
                if protocol_errors > self.config.max_protocol_errors {
                    let reason = format!(
                        "{} consecutive protocol errors, last: {}",
                        protocol_errors, message
                    );
                    return self.fail(job, &label, &reason).await;
                }
            } else {
                protocol_errors = 0;
            }

            let wait = self.backoff.on_failure().await;
            let wait = err.retry_after().unwrap_or(wait);
            warn!(job_id = job.id, "Submission failed: {}", err);
            self.progress
                .failure(&job_line(&label, &format!("Retry after {}.", secs(wait))));

            if !pause(&self.shutdown, wait).await {
                return Submitted::Interrupted;
            }
        }
    }

    /// Persists an accepted submission
    ///
    /// Storage errors retry the write, never the submission, so the remote
    /// job is not duplicated.
    async fn record_submission(&self, job: &Job, label: &str, handle: &str) -> Submitted {
        loop {
            match self.queue.mark_submitted(job.id, handle).await {
                Ok(()) => break,
                Err(QueueError::Conflict { message, .. }) => {
                    warn!(
                        job_id = job.id,
                        remote_handle = handle,
                        "Job advanced by another worker after submission: {}",
                        message
                    );
                    return Submitted::Skipped;
                }
                Err(e @ QueueError::Storage(_)) => {
                    let wait = self.backoff.on_failure().await;
                    error!(
                        job_id = job.id,
                        remote_handle = handle,
                        "Failed to record submission, retrying in {:?}: {}",
                        wait,
                        e
                    );
                    if !pause(&self.shutdown, wait).await {
                        error!(
                            job_id = job.id,
                            remote_handle = handle,
                            "Shutdown before the submission was recorded; remote job is orphaned"
                        );
                        return Submitted::Interrupted;
                    }
                }
            }
        }

        let wait = self.backoff.on_success().await;
        info!(job_id = job.id, remote_handle = handle, "Job submitted");
        self.progress
            .success(&job_line(label, &format!("Next after {}.", secs(wait))));

        // Interrupted pacing is picked up before the next submission
        pause(&self.shutdown, wait).await;
        Submitted::InFlight
    }

    /// Records a job the server will not take
    ///
    /// Storage errors retry the write, never the submission.
    async fn fail(&self, job: &Job, label: &str, reason: &str) -> Submitted {
        loop {
            match self.queue.mark_failed(job.id, reason).await {
                Ok(()) => {
                    warn!(job_id = job.id, "Job failed: {}", reason);
                    self.progress
                        .failure(&job_line(label, &format!("Failed: {}", reason)));
                    return Submitted::Failed;
                }
                Err(QueueError::Conflict { message, .. }) => {
                    warn!(job_id = job.id, "Job advanced by another worker: {}", message);
                    return Submitted::Skipped;
                }
                Err(e @ QueueError::Storage(_)) => {
                    let wait = self.backoff.on_failure().await;
                    error!(
                        job_id = job.id,
                        "Failed to record job failure, retrying in {:?}: {}", wait, e
                    );
                    if !pause(&self.shutdown, wait).await {
                        return Submitted::Interrupted;
                    }
                }
            }
        }
    }
}
