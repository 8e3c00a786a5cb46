//! In-memory adapters for scheduler tests

use async_trait::async_trait;
use chrono::Utc;
use simq_client::Credentials;
use simq_core::domain::alpha::Alpha;
use simq_core::domain::job::{DEFAULT_JOB_TYPE, Job, JobId};
use simq_core::domain::lifecycle::JobState;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use tokio::time::Instant;

use crate::config::Config;
use crate::error::{QueueError, RemoteError};
use crate::repository::{JobQueue, PollStatus, RemoteJobClient};

pub fn test_config() -> Config {
    Config::new(Credentials::new("user@example.com", "secret"))
}

pub fn pending_job(id: JobId, expression: &str) -> Job {
    Job {
        id,
        expression: expression.to_string(),
        job_type: DEFAULT_JOB_TYPE.to_string(),
        settings: serde_json::json!({}),
        state: JobState::Pending,
        remote_handle: None,
        artifact_id: None,
        failure_reason: None,
        created_at: Utc::now(),
        submitted_at: None,
        completed_at: None,
    }
}

pub fn in_flight_job(id: JobId, expression: &str, handle: &str) -> Job {
    Job {
        state: JobState::InFlight,
        remote_handle: Some(handle.to_string()),
        submitted_at: Some(Utc::now()),
        ..pending_job(id, expression)
    }
}

/// Job queue kept in a vector, enforcing the same transitions as the store
#[derive(Default)]
pub struct MemoryQueue {
    jobs: Mutex<Vec<Job>>,
    artifacts: Mutex<Vec<Alpha>>,
    storage_failures: AtomicU32,
}

impl MemoryQueue {
    pub fn new(jobs: Vec<Job>) -> Arc<Self> {
        Arc::new(Self {
            jobs: Mutex::new(jobs),
            ..Self::default()
        })
    }

    pub fn push(&self, job: Job) {
        self.jobs.lock().unwrap().push(job);
    }

    pub fn job(&self, id: JobId) -> Job {
        self.jobs
            .lock()
            .unwrap()
            .iter()
            .find(|j| j.id == id)
            .cloned()
            .unwrap()
    }

    pub fn state(&self, id: JobId) -> JobState {
        self.job(id).state
    }

    pub fn artifacts(&self) -> Vec<Alpha> {
        self.artifacts.lock().unwrap().clone()
    }

    /// Makes the next `n` writes fail with a storage error
    pub fn fail_next_writes(&self, n: u32) {
        self.storage_failures.store(n, Ordering::SeqCst);
    }

    fn check_storage(&self) -> Result<(), QueueError> {
        let left = self.storage_failures.load(Ordering::SeqCst);
        if left > 0 {
            self.storage_failures.store(left - 1, Ordering::SeqCst);
            return Err(QueueError::Storage("database is locked".to_string()));
        }
        Ok(())
    }

    fn list(&self, state: JobState) -> Vec<Job> {
        let mut jobs: Vec<Job> = self
            .jobs
            .lock()
            .unwrap()
            .iter()
            .filter(|j| j.state == state)
            .cloned()
            .collect();
        jobs.sort_by_key(|j| j.id);
        jobs
    }

    fn transition(
        &self,
        id: JobId,
        next: JobState,
        apply: impl FnOnce(&mut Job),
    ) -> Result<(), QueueError> {
        self.check_storage()?;
        let mut jobs = self.jobs.lock().unwrap();
        let job = jobs
            .iter_mut()
            .find(|j| j.id == id)
            .ok_or_else(|| QueueError::Conflict {
                id,
                message: "not found".to_string(),
            })?;
        job.state = job.state.transition_to(next).map_err(|e| QueueError::Conflict {
            id,
            message: e.to_string(),
        })?;
        apply(job);
        Ok(())
    }
}

#[async_trait]
impl JobQueue for MemoryQueue {
    async fn list_pending(&self) -> Result<Vec<Job>, QueueError> {
        Ok(self.list(JobState::Pending))
    }

    async fn list_in_flight(&self) -> Result<Vec<Job>, QueueError> {
        Ok(self.list(JobState::InFlight))
    }

    async fn mark_submitted(&self, id: JobId, remote_handle: &str) -> Result<(), QueueError> {
        self.transition(id, JobState::InFlight, |job| {
            job.remote_handle = Some(remote_handle.to_string());
            job.submitted_at = Some(Utc::now());
        })
    }

    async fn mark_done(&self, id: JobId, artifact_id: &str) -> Result<(), QueueError> {
        self.transition(id, JobState::Done, |job| {
            job.artifact_id = Some(artifact_id.to_string());
            job.completed_at = Some(Utc::now());
        })
    }

    async fn mark_failed(&self, id: JobId, reason: &str) -> Result<(), QueueError> {
        self.transition(id, JobState::Failed, |job| {
            job.failure_reason = Some(reason.to_string());
            job.completed_at = Some(Utc::now());
        })
    }

    async fn save_artifact(&self, alpha: &Alpha) -> Result<(), QueueError> {
        self.check_storage()?;
        let mut artifacts = self.artifacts.lock().unwrap();
        artifacts.retain(|a| a.id != alpha.id);
        artifacts.push(alpha.clone());
        Ok(())
    }
}

/// Remote client replaying scripted outcomes
///
/// Once a script runs out, submissions return `h<id>` and polls complete
/// with artifact `a-<handle>`. Artifact fetches succeed unless failures were
/// queued with [`ScriptedRemote::with_fetch_failures`].
#[derive(Default)]
pub struct ScriptedRemote {
    submits: Mutex<VecDeque<Result<String, RemoteError>>>,
    polls: Mutex<HashMap<String, VecDeque<Result<PollStatus, RemoteError>>>>,
    /// Job submitted, and its state in the observed queue at that moment
    submit_log: Mutex<Vec<(JobId, Option<JobState>)>>,
    poll_log: Mutex<Vec<(String, Instant)>>,
    fetch_failures: AtomicU32,
    observed: Option<Arc<MemoryQueue>>,
}

impl ScriptedRemote {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the job's queue state on every submission
    pub fn observing(mut self, queue: Arc<MemoryQueue>) -> Self {
        self.observed = Some(queue);
        self
    }

    pub fn with_submits(self, outcomes: Vec<Result<String, RemoteError>>) -> Self {
        self.submits.lock().unwrap().extend(outcomes);
        self
    }

    pub fn with_polls(self, handle: &str, outcomes: Vec<Result<PollStatus, RemoteError>>) -> Self {
        self.polls
            .lock()
            .unwrap()
            .entry(handle.to_string())
            .or_default()
            .extend(outcomes);
        self
    }

    /// Makes the next `n` artifact fetches fail with a transient error
    pub fn with_fetch_failures(self, n: u32) -> Self {
        self.fetch_failures.store(n, Ordering::SeqCst);
        self
    }

    pub fn submit_log(&self) -> Vec<(JobId, Option<JobState>)> {
        self.submit_log.lock().unwrap().clone()
    }

    pub fn poll_times(&self, handle: &str) -> Vec<Instant> {
        self.poll_log
            .lock()
            .unwrap()
            .iter()
            .filter(|(h, _)| h == handle)
            .map(|(_, at)| *at)
            .collect()
    }
}

#[async_trait]
impl RemoteJobClient for ScriptedRemote {
    async fn submit(&self, job: &Job) -> Result<String, RemoteError> {
        let state = self.observed.as_ref().map(|q| q.state(job.id));
        self.submit_log.lock().unwrap().push((job.id, state));

        self.submits
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(format!("h{}", job.id)))
    }

    async fn poll(&self, remote_handle: &str) -> Result<PollStatus, RemoteError> {
        self.poll_log
            .lock()
            .unwrap()
            .push((remote_handle.to_string(), Instant::now()));

        self.polls
            .lock()
            .unwrap()
            .get_mut(remote_handle)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| {
                Ok(PollStatus::Complete {
                    artifact_id: format!("a-{}", remote_handle),
                })
            })
    }

    async fn fetch_artifact(&self, artifact_id: &str) -> Result<Alpha, RemoteError> {
        let left = self.fetch_failures.load(Ordering::SeqCst);
        if left > 0 {
            self.fetch_failures.store(left - 1, Ordering::SeqCst);
            return Err(RemoteError::Transient("502 bad gateway".to_string()));
        }

        Ok(serde_json::from_value(serde_json::json!({
            "id": artifact_id,
            "status": "UNSUBMITTED",
            "is": { "checks": [{ "name": "LOW_SHARPE", "result": "PASS" }] }
        }))
        .unwrap())
    }
}
