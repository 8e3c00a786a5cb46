//! Collection scheduler
//!
//! Scans `IN_FLIGHT` jobs and polls each one until the remote side reaches a
//! terminal state. Jobs are polled concurrently, one task per job, bounded
//! by a semaphore; the pass waits for every task before rescanning so a job
//! is never handled twice by one process.
//!
//! A server `Retry-After` hint is obeyed exactly and overrides the local
//! backoff. Without a hint the job waits the controller's current wait.
//! Poll failures are bounded per job; once exceeded the job is failed.

use simq_core::domain::job::Job;
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::backoff::SharedBackoff;
use super::progress::{Progress, job_line, secs};
use super::{RunSummary, limit_reached, pause};
use crate::config::Config;
use crate::error::{QueueError, RemoteError};
use crate::repository::{JobQueue, PollStatus, RemoteJobClient};

/// What became of one in-flight job
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Collected {
    Done,
    Failed,
    /// Another worker advanced the job first
    Skipped,
    Interrupted,
}

/// Collects the results of submitted jobs
///
/// Cheap to clone; clones share the backoff, counters and semaphore.
#[derive(Clone)]
pub struct CollectionScheduler {
    config: Arc<Config>,
    queue: Arc<dyn JobQueue>,
    remote: Arc<dyn RemoteJobClient>,
    backoff: Arc<SharedBackoff>,
    progress: Arc<Progress>,
    semaphore: Arc<Semaphore>,
    shutdown: CancellationToken,
    /// Cancelled once whatever feeds the queue has finished
    upstream: Option<CancellationToken>,
}

impl CollectionScheduler {
    /// Creates a new collection scheduler
    pub fn new(
        config: Config,
        queue: Arc<dyn JobQueue>,
        remote: Arc<dyn RemoteJobClient>,
        shutdown: CancellationToken,
    ) -> Self {
        let backoff = Arc::new(SharedBackoff::new(config.backoff));
        let semaphore = Arc::new(Semaphore::new(config.max_concurrent_polls));
        Self {
            config: Arc::new(config),
            queue,
            remote,
            backoff,
            progress: Arc::new(Progress::new()),
            semaphore,
            shutdown,
            upstream: None,
        }
    }

    /// Keeps a batch run alive until `finished` is cancelled
    ///
    /// Used when submission runs alongside: an empty scan only ends the run
    /// once no more jobs can arrive.
    pub fn with_upstream(mut self, finished: CancellationToken) -> Self {
        self.upstream = Some(finished);
        self
    }

    fn upstream_finished(&self) -> bool {
        self.upstream.as_ref().is_none_or(CancellationToken::is_cancelled)
    }

    /// Runs until no in-flight jobs remain, the job limit is hit or shutdown
    pub async fn run(&self) -> RunSummary {
        info!(
            "Starting collection scheduler (limit: {:?}, watch: {}, concurrency: {})",
            self.config.job_limit(),
            self.config.watch,
            self.config.max_concurrent_polls
        );

        let mut summary = RunSummary::default();

        while !self.shutdown.is_cancelled()
            && !limit_reached(self.config.job_limit(), summary.total())
        {
            let jobs = match self.queue.list_in_flight().await {
                Ok(jobs) => jobs,
                Err(e) => {
                    let wait = self.backoff.on_failure().await;
                    error!("Failed to list in-flight jobs: {}", e);
                    self.progress
                        .note(&format!("Queue unavailable. Rescan after {}.", secs(wait)));
                    if !pause(&self.shutdown, wait).await {
                        break;
                    }
                    continue;
                }
            };

            if jobs.is_empty() {
                if !self.config.watch && self.upstream_finished() {
                    info!("No in-flight jobs left");
                    break;
                }
                debug!("No in-flight jobs, rescanning in {:?}", self.config.scan_interval);
                if !pause(&self.shutdown, self.config.scan_interval).await {
                    break;
                }
                continue;
            }

            let take = match self.config.job_limit() {
                Some(limit) => jobs.len().min((limit - summary.total()) as usize),
                None => jobs.len(),
            };
            info!("Collecting {} in-flight job(s)", take);

            let mut handles = Vec::with_capacity(take);
            for job in jobs.into_iter().take(take) {
                let permit = tokio::select! {
                    _ = self.shutdown.cancelled() => break,
                    permit = self.semaphore.clone().acquire_owned() => match permit {
                        Ok(permit) => permit,
                        Err(_) => break,
                    },
                };
                handles.push(self.spawn_collect_task(job, permit));
            }

            let mut crashed = 0;
            for handle in handles {
                match handle.await {
                    Ok(Collected::Done) => summary.succeeded += 1,
                    Ok(Collected::Failed) => summary.failed += 1,
                    Ok(Collected::Skipped | Collected::Interrupted) => {}
                    Err(e) => {
                        error!("Collection task panicked: {}", e);
                        crashed += 1;
                    }
                }
            }

            // Crashed jobs are still IN_FLIGHT; do not rescan them straight away
            if crashed > 0 {
                let wait = self.backoff.on_failure().await;
                self.progress.note(&format!(
                    "{} collection task(s) crashed. Rescan after {}.",
                    crashed,
                    secs(wait)
                ));
                if !pause(&self.shutdown, wait).await {
                    break;
                }
            }
        }

        info!(
            "Collection scheduler stopped: {} done, {} failed",
            summary.succeeded, summary.failed
        );
        summary
    }

    /// Spawns a task to collect a single job
    fn spawn_collect_task(&self, job: Job, permit: OwnedSemaphorePermit) -> JoinHandle<Collected> {
        let this = self.clone();

        tokio::spawn(async move {
            let outcome = this.collect_job(job).await;
            drop(permit);
            outcome
        })
    }

    /// Polls one job until it reaches a terminal state
    async fn collect_job(&self, job: Job) -> Collected {
        let label = job.short_expression(50);
        let Some(handle) = job.remote_handle.as_deref() else {
            return self.fail(&job, &label, "in-flight job has no remote handle").await;
        };

        let mut failures = 0u32;

        loop {
            if self.shutdown.is_cancelled() {
                return Collected::Interrupted;
            }

            let (error, hint) = match self.remote.poll(handle).await {
                Ok(PollStatus::Pending {
                    retry_after: Some(hint),
                }) => {
                    failures = 0;
                    debug!(job_id = job.id, "Still running, server asks to wait {:?}", hint);
                    if !pause(&self.shutdown, hint).await {
                        return Collected::Interrupted;
                    }
                    continue;
                }
                Ok(PollStatus::Pending { retry_after: None }) => {
                    failures = 0;
                    let wait = self.backoff.current().await;
                    debug!(job_id = job.id, "Still running, polling again in {:?}", wait);
                    if !pause(&self.shutdown, wait).await {
                        return Collected::Interrupted;
                    }
                    continue;
                }
                Ok(PollStatus::Complete { artifact_id }) => {
                    match self.complete(&job, &label, &artifact_id).await {
                        Ok(outcome) => return outcome,
                        Err(e) => (e, None),
                    }
                }
                Ok(PollStatus::PermanentFailure { reason }) => {
                    return self.fail(&job, &label, &reason).await;
                }
                Err(RemoteError::Rejected(reason)) => {
                    return self.fail(&job, &label, &reason).await;
                }
                Err(e) => (e.to_string(), e.retry_after()),
            };

            failures += 1;
            if failures > self.config.max_poll_failures {
                let reason = format!(
                    "gave up after {} consecutive poll failures, last: {}",
                    failures, error
                );
                return self.fail(&job, &label, &reason).await;
            }

            let wait = self.backoff.on_failure().await;
            let wait = hint.unwrap_or(wait);
            warn!(
                job_id = job.id,
                "Poll failed ({}/{}): {}",
                failures,
                self.config.max_poll_failures,
                error
            );
            self.progress
                .failure(&job_line(&label, &format!("Retry after {}.", secs(wait))));

            if !pause(&self.shutdown, wait).await {
                return Collected::Interrupted;
            }
        }
    }

    /// Fetches and stores the artifact, then marks the job done
    ///
    /// # Returns
    /// The outcome, or a diagnostic counted as a poll failure
    async fn complete(&self, job: &Job, label: &str, artifact_id: &str) -> Result<Collected, String> {
        let alpha = self
            .remote
            .fetch_artifact(artifact_id)
            .await
            .map_err(|e| format!("failed to fetch alpha {}: {}", artifact_id, e))?;

        self.queue
            .save_artifact(&alpha)
            .await
            .map_err(|e| format!("failed to save alpha {}: {}", artifact_id, e))?;

        match self.queue.mark_done(job.id, artifact_id).await {
            Ok(()) => {}
            Err(QueueError::Conflict { message, .. }) => {
                warn!(job_id = job.id, "Job advanced by another worker: {}", message);
                return Ok(Collected::Skipped);
            }
            Err(e @ QueueError::Storage(_)) => {
                return Err(format!("failed to mark job done: {}", e));
            }
        }

        self.backoff.on_success().await;
        let verdict = alpha.check_verdict();
        info!(
            job_id = job.id,
            artifact_id,
            checks = verdict.as_str(),
            "Job done"
        );
        self.progress.success(&job_line(
            label,
            &format!("New alpha: {} ({})", artifact_id, verdict.as_str()),
        ));

        Ok(Collected::Done)
    }

    /// Records a job that will not produce an alpha
    ///
    /// Storage errors retry the write until it lands or shutdown; the job is
    /// not polled again meanwhile.
    async fn fail(&self, job: &Job, label: &str, reason: &str) -> Collected {
        loop {
            match self.queue.mark_failed(job.id, reason).await {
                Ok(()) => {
                    warn!(job_id = job.id, "Job failed: {}", reason);
                    self.progress
                        .failure(&job_line(label, &format!("Failed: {}", reason)));
                    return Collected::Failed;
                }
                Err(QueueError::Conflict { message, .. }) => {
                    warn!(job_id = job.id, "Job advanced by another worker: {}", message);
                    return Collected::Skipped;
                }
                Err(e @ QueueError::Storage(_)) => {
                    let wait = self.backoff.on_failure().await;
                    error!(
                        job_id = job.id,
                        "Failed to record job failure, retrying in {:?}: {}", wait, e
                    );
                    if !pause(&self.shutdown, wait).await {
                        return Collected::Interrupted;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::testing::{
        MemoryQueue, ScriptedRemote, in_flight_job, pending_job, test_config,
    };
    use simq_core::domain::lifecycle::JobState;
    use std::time::Duration;

    fn scheduler(
        config: Config,
        queue: &Arc<MemoryQueue>,
        remote: &Arc<ScriptedRemote>,
    ) -> CollectionScheduler {
        CollectionScheduler::new(
            config,
            queue.clone(),
            remote.clone(),
            CancellationToken::new(),
        )
    }

    fn transient(message: &str) -> Result<PollStatus, RemoteError> {
        Err(RemoteError::Transient(message.to_string()))
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_after_hint_is_obeyed_exactly() {
        let queue = MemoryQueue::new(vec![in_flight_job(1, "close-open", "h1")]);
        let remote = Arc::new(ScriptedRemote::new().with_polls(
            "h1",
            vec![
                Ok(PollStatus::Pending {
                    retry_after: Some(Duration::from_secs(5)),
                }),
                Ok(PollStatus::Complete {
                    artifact_id: "a1".to_string(),
                }),
            ],
        ));
        let scheduler = scheduler(test_config(), &queue, &remote);

        let summary = scheduler.run().await;

        let polls = remote.poll_times("h1");
        assert_eq!(polls.len(), 2);
        let gap = polls[1] - polls[0];
        assert!(gap >= Duration::from_secs(5), "gap was {:?}", gap);
        assert!(gap < Duration::from_millis(5_010), "gap was {:?}", gap);

        assert_eq!(summary, RunSummary { succeeded: 1, failed: 0 });
        let job = queue.job(1);
        assert_eq!(job.state, JobState::Done);
        assert_eq!(job.artifact_id.as_deref(), Some("a1"));
        assert!(job.completed_at.is_some());
        assert_eq!(queue.artifacts().len(), 1);
        assert_eq!(queue.artifacts()[0].id, "a1");
    }

    #[tokio::test(start_paused = true)]
    async fn test_pending_without_hint_waits_current_backoff() {
        let queue = MemoryQueue::new(vec![in_flight_job(1, "close-open", "h1")]);
        let remote = Arc::new(ScriptedRemote::new().with_polls(
            "h1",
            vec![Ok(PollStatus::Pending { retry_after: None })],
        ));
        let scheduler = scheduler(test_config(), &queue, &remote);

        scheduler.run().await;

        let polls = remote.poll_times("h1");
        assert_eq!(polls.len(), 2);
        let gap = polls[1] - polls[0];
        assert!(gap >= Duration::from_secs(1) && gap < Duration::from_millis(1_010));
        assert_eq!(queue.state(1), JobState::Done);
    }

    #[tokio::test(start_paused = true)]
    async fn test_permanent_failure_fails_job() {
        let queue = MemoryQueue::new(vec![in_flight_job(1, "close-open", "h1")]);
        let remote = Arc::new(ScriptedRemote::new().with_polls(
            "h1",
            vec![Ok(PollStatus::PermanentFailure {
                reason: "simulation ended with status ERROR".to_string(),
            })],
        ));
        let scheduler = scheduler(test_config(), &queue, &remote);

        let summary = scheduler.run().await;

        assert_eq!(summary, RunSummary { succeeded: 0, failed: 1 });
        let job = queue.job(1);
        assert_eq!(job.state, JobState::Failed);
        assert!(job.completed_at.is_some());
        assert!(job.artifact_id.is_none());
        assert!(queue.artifacts().is_empty());
        assert_eq!(remote.poll_times("h1").len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_failures_are_bounded() {
        let queue = MemoryQueue::new(vec![in_flight_job(1, "close-open", "h1")]);
        let remote = Arc::new(ScriptedRemote::new().with_polls(
            "h1",
            vec![
                transient("timeout"),
                transient("timeout"),
                transient("502"),
                transient("connection reset"),
            ],
        ));
        let scheduler = scheduler(test_config(), &queue, &remote);

        scheduler.run().await;

        assert_eq!(remote.poll_times("h1").len(), 4);
        let job = queue.job(1);
        assert_eq!(job.state, JobState::Failed);
        assert!(job.failure_reason.unwrap().contains("4 consecutive poll failures"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_failures_reset_on_progress() {
        let queue = MemoryQueue::new(vec![in_flight_job(1, "close-open", "h1")]);
        let remote = Arc::new(ScriptedRemote::new().with_polls(
            "h1",
            vec![
                transient("timeout"),
                transient("timeout"),
                transient("timeout"),
                Ok(PollStatus::Pending { retry_after: None }),
                transient("timeout"),
                transient("timeout"),
                Err(RemoteError::Protocol("invalid Retry-After".to_string())),
            ],
        ));
        let scheduler = scheduler(test_config(), &queue, &remote);

        scheduler.run().await;

        assert_eq!(remote.poll_times("h1").len(), 8);
        assert_eq!(queue.state(1), JobState::Done);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejected_poll_fails_job() {
        let queue = MemoryQueue::new(vec![in_flight_job(1, "close-open", "h1")]);
        let remote = Arc::new(ScriptedRemote::new().with_polls(
            "h1",
            vec![Err(RemoteError::Rejected("404 not found".to_string()))],
        ));
        let scheduler = scheduler(test_config(), &queue, &remote);

        scheduler.run().await;

        assert_eq!(queue.state(1), JobState::Failed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_storage_error_on_done_is_retried() {
        let queue = MemoryQueue::new(vec![in_flight_job(1, "close-open", "h1")]);
        queue.fail_next_writes(1);
        let remote = Arc::new(ScriptedRemote::new());
        let scheduler = scheduler(test_config(), &queue, &remote);

        scheduler.run().await;

        assert_eq!(remote.poll_times("h1").len(), 2);
        let job = queue.job(1);
        assert_eq!(job.state, JobState::Done);
        assert_eq!(job.artifact_id.as_deref(), Some("a-h1"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_fetch_counts_as_poll_failure() {
        let queue = MemoryQueue::new(vec![in_flight_job(1, "close-open", "h1")]);
        let remote = Arc::new(ScriptedRemote::new().with_fetch_failures(1));
        let scheduler = scheduler(test_config(), &queue, &remote);

        let summary = scheduler.run().await;

        assert_eq!(summary, RunSummary { succeeded: 1, failed: 0 });
        assert_eq!(remote.poll_times("h1").len(), 2);
        assert_eq!(queue.state(1), JobState::Done);
        assert_eq!(queue.artifacts().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_repeated_fetch_failures_fail_job() {
        let config = test_config();
        let queue = MemoryQueue::new(vec![in_flight_job(1, "close-open", "h1")]);
        let remote =
            Arc::new(ScriptedRemote::new().with_fetch_failures(config.max_poll_failures + 1));
        let scheduler = scheduler(config, &queue, &remote);

        let summary = scheduler.run().await;

        assert_eq!(summary, RunSummary { succeeded: 0, failed: 1 });
        assert_eq!(remote.poll_times("h1").len(), 4);
        let job = queue.job(1);
        assert_eq!(job.state, JobState::Failed);
        assert!(job.failure_reason.unwrap().contains("failed to fetch alpha a-h1"));
        assert!(queue.artifacts().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_storage_error_on_failure_is_retried_without_polling() {
        let queue = MemoryQueue::new(vec![in_flight_job(1, "close-open", "h1")]);
        queue.fail_next_writes(3);
        let remote = Arc::new(ScriptedRemote::new().with_polls(
            "h1",
            vec![Ok(PollStatus::PermanentFailure {
                reason: "simulation ended with status ERROR".to_string(),
            })],
        ));
        let scheduler = scheduler(test_config(), &queue, &remote);

        let start = tokio::time::Instant::now();
        let summary = scheduler.run().await;

        assert_eq!(summary, RunSummary { succeeded: 0, failed: 1 });
        assert_eq!(remote.poll_times("h1").len(), 1);
        assert_eq!(queue.state(1), JobState::Failed);
        assert!(start.elapsed() >= Duration::from_secs(15));
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limited_poll_waits_for_hint() {
        let queue = MemoryQueue::new(vec![in_flight_job(1, "close-open", "h1")]);
        let remote = Arc::new(ScriptedRemote::new().with_polls(
            "h1",
            vec![Err(RemoteError::RateLimited {
                retry_after: Some(Duration::from_secs(5)),
                message: "too many requests".to_string(),
            })],
        ));
        let scheduler = scheduler(test_config(), &queue, &remote);

        scheduler.run().await;

        let polls = remote.poll_times("h1");
        assert_eq!(polls.len(), 2);
        let gap = polls[1] - polls[0];
        assert!(gap >= Duration::from_secs(5) && gap < Duration::from_millis(5_010));
        assert_eq!(queue.state(1), JobState::Done);
    }

    /// Remote whose polls blow up
    #[derive(Default)]
    struct CrashingRemote {
        polls: std::sync::atomic::AtomicU32,
    }

    #[async_trait::async_trait]
    impl RemoteJobClient for CrashingRemote {
        async fn submit(&self, _job: &Job) -> Result<String, RemoteError> {
            unreachable!("collector never submits")
        }

        async fn poll(&self, _remote_handle: &str) -> Result<PollStatus, RemoteError> {
            self.polls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            panic!("poll crashed");
        }

        async fn fetch_artifact(
            &self,
            _artifact_id: &str,
        ) -> Result<simq_core::domain::alpha::Alpha, RemoteError> {
            unreachable!("polls never complete")
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_crashed_task_backs_off_before_rescan() {
        let queue = MemoryQueue::new(vec![in_flight_job(1, "close-open", "h1")]);
        let remote = Arc::new(CrashingRemote::default());
        let shutdown = CancellationToken::new();
        let scheduler =
            CollectionScheduler::new(test_config(), queue.clone(), remote.clone(), shutdown.clone());

        let stopper = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(10)).await;
            shutdown.cancel();
        });

        let summary = scheduler.run().await;
        stopper.await.unwrap();

        // Polls at 0s, 2.1s and 6.51s; the next rescan would be after 16s
        let polls = remote.polls.load(std::sync::atomic::Ordering::SeqCst);
        assert_eq!(polls, 3);
        assert_eq!(summary.total(), 0);
        assert_eq!(queue.state(1), JobState::InFlight);
    }

    #[tokio::test(start_paused = true)]
    async fn test_jobs_are_polled_concurrently() {
        let hint = Ok(PollStatus::Pending {
            retry_after: Some(Duration::from_secs(10)),
        });
        let queue = MemoryQueue::new(vec![
            in_flight_job(1, "close-open", "h1"),
            in_flight_job(2, "rank(volume)", "h2"),
            in_flight_job(3, "-returns", "h3"),
        ]);
        let remote = Arc::new(
            ScriptedRemote::new()
                .with_polls("h1", vec![hint.clone()])
                .with_polls("h2", vec![hint.clone()])
                .with_polls("h3", vec![hint]),
        );
        let scheduler = scheduler(test_config(), &queue, &remote);

        let start = tokio::time::Instant::now();
        let summary = scheduler.run().await;

        assert_eq!(summary.succeeded, 3);
        assert!(start.elapsed() < Duration::from_secs(11));
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrency_limit_is_respected() {
        let mut config = test_config();
        config.max_concurrent_polls = 1;
        let hint = Ok(PollStatus::Pending {
            retry_after: Some(Duration::from_secs(10)),
        });
        let queue = MemoryQueue::new(vec![
            in_flight_job(1, "close-open", "h1"),
            in_flight_job(2, "rank(volume)", "h2"),
        ]);
        let remote = Arc::new(
            ScriptedRemote::new()
                .with_polls("h1", vec![hint.clone()])
                .with_polls("h2", vec![hint]),
        );
        let scheduler = scheduler(config, &queue, &remote);

        let start = tokio::time::Instant::now();
        scheduler.run().await;

        assert!(start.elapsed() >= Duration::from_secs(20));
        assert!(remote.poll_times("h2")[0] >= remote.poll_times("h1")[1]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_job_limit() {
        let mut config = test_config();
        config.max_jobs = 1;
        let queue = MemoryQueue::new(vec![
            in_flight_job(1, "close-open", "h1"),
            in_flight_job(2, "rank(volume)", "h2"),
        ]);
        let remote = Arc::new(ScriptedRemote::new());
        let scheduler = scheduler(config, &queue, &remote);

        let summary = scheduler.run().await;

        assert_eq!(summary.total(), 1);
        assert_eq!(queue.state(1), JobState::Done);
        assert_eq!(queue.state(2), JobState::InFlight);
    }

    #[tokio::test(start_paused = true)]
    async fn test_batch_run_waits_for_upstream() {
        let queue = MemoryQueue::new(vec![pending_job(1, "close-open")]);
        let remote = Arc::new(ScriptedRemote::new());
        let upstream = CancellationToken::new();
        let scheduler = scheduler(test_config(), &queue, &remote).with_upstream(upstream.clone());

        let feeder = {
            let queue = queue.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_secs(7)).await;
                queue.mark_submitted(1, "h1").await.unwrap();
                upstream.cancel();
            })
        };

        let summary = scheduler.run().await;
        feeder.await.unwrap();

        assert_eq!(summary.succeeded, 1);
        assert_eq!(queue.state(1), JobState::Done);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_leaves_jobs_in_flight() {
        let queue = MemoryQueue::new(vec![in_flight_job(1, "close-open", "h1")]);
        let remote = Arc::new(ScriptedRemote::new().with_polls(
            "h1",
            vec![Ok(PollStatus::Pending {
                retry_after: Some(Duration::from_secs(60)),
            })],
        ));
        let shutdown = CancellationToken::new();
        let scheduler =
            CollectionScheduler::new(test_config(), queue.clone(), remote.clone(), shutdown.clone());

        let stopper = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(3)).await;
            shutdown.cancel();
        });

        let summary = scheduler.run().await;
        stopper.await.unwrap();

        assert_eq!(summary.total(), 0);
        assert_eq!(queue.state(1), JobState::InFlight);
    }
}
