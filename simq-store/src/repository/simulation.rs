//! Simulation Repository
//!
//! The durable job queue. Every state change is a single conditional
//! `UPDATE` guarded by the lifecycle's legal predecessor states, so two
//! workers can never advance the same job twice.

use chrono::{DateTime, Utc};
use simq_core::domain::job::{Job, JobId, NewJob, StateCounts};
use simq_core::domain::lifecycle::JobState;
use sqlx::SqlitePool;

use crate::error::{Result, StoreError};

const JOB_COLUMNS: &str = "id, expr, type, settings, status, created_at, submitted_at, \
                           remote_handle, completed_at, alpha_id, failure_reason";

/// Put a new job on the queue
pub async fn enqueue(pool: &SqlitePool, req: NewJob) -> Result<Job> {
    let now = Utc::now();
    let settings = serde_json::to_string(&req.settings)?;

    let result = sqlx::query(
        r#"
        INSERT INTO simulations (expr, type, settings, status, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5)
        "#,
    )
    .bind(&req.expression)
    .bind(&req.job_type)
    .bind(&settings)
    .bind(JobState::Pending.as_str())
    .bind(now.timestamp_millis())
    .execute(pool)
    .await?;

    Ok(Job {
        id: result.last_insert_rowid(),
        expression: req.expression,
        job_type: req.job_type,
        settings: req.settings,
        state: JobState::Pending,
        remote_handle: None,
        artifact_id: None,
        failure_reason: None,
        created_at: from_millis(now.timestamp_millis())?,
        submitted_at: None,
        completed_at: None,
    })
}

/// Put several jobs on the queue in one transaction
pub async fn enqueue_many(pool: &SqlitePool, reqs: Vec<NewJob>) -> Result<Vec<JobId>> {
    let now = Utc::now().timestamp_millis();
    let mut tx = pool.begin().await?;
    let mut ids = Vec::with_capacity(reqs.len());

    for req in reqs {
        let settings = serde_json::to_string(&req.settings)?;
        let result = sqlx::query(
            r#"
            INSERT INTO simulations (expr, type, settings, status, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(&req.expression)
        .bind(&req.job_type)
        .bind(&settings)
        .bind(JobState::Pending.as_str())
        .bind(now)
        .execute(&mut *tx)
        .await?;

        ids.push(result.last_insert_rowid());
    }

    tx.commit().await?;
    Ok(ids)
}

/// Find a job by ID
pub async fn find_by_id(pool: &SqlitePool, id: JobId) -> Result<Option<Job>> {
    let sql = format!("SELECT {} FROM simulations WHERE id = ?1", JOB_COLUMNS);
    let row = sqlx::query_as::<_, JobRow>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;

    row.map(Job::try_from).transpose()
}

/// Find jobs in a state, in insertion order
pub async fn find_by_state(
    pool: &SqlitePool,
    state: JobState,
    limit: Option<u32>,
) -> Result<Vec<Job>> {
    let sql = format!(
        "SELECT {} FROM simulations WHERE status = ?1 ORDER BY id ASC LIMIT ?2",
        JOB_COLUMNS
    );
    let rows = sqlx::query_as::<_, JobRow>(&sql)
        .bind(state.as_str())
        .bind(limit.map(i64::from).unwrap_or(-1))
        .fetch_all(pool)
        .await?;

    rows.into_iter().map(Job::try_from).collect()
}

/// List all jobs, in insertion order
pub async fn list_all(pool: &SqlitePool) -> Result<Vec<Job>> {
    let sql = format!("SELECT {} FROM simulations ORDER BY id ASC", JOB_COLUMNS);
    let rows = sqlx::query_as::<_, JobRow>(&sql).fetch_all(pool).await?;

    rows.into_iter().map(Job::try_from).collect()
}

/// Count jobs per lifecycle state
pub async fn count_by_state(pool: &SqlitePool) -> Result<StateCounts> {
    let rows: Vec<(String, i64)> =
        sqlx::query_as("SELECT status, COUNT(*) FROM simulations GROUP BY status")
            .fetch_all(pool)
            .await?;

    let mut counts = StateCounts::default();
    for (status, count) in rows {
        let state = parse_state(&status)?;
        counts.set(state, count.max(0) as u64);
    }

    Ok(counts)
}

/// `PENDING -> IN_FLIGHT`: record the remote handle of an accepted submission
pub async fn mark_submitted(pool: &SqlitePool, id: JobId, remote_handle: &str) -> Result<()> {
    let to = JobState::InFlight;
    let sql = format!(
        r#"
        UPDATE simulations
        SET status = ?1, remote_handle = ?2, submitted_at = MAX(?3, created_at)
        WHERE id = ?4 AND status IN ({})
        "#,
        predecessors_sql(to)
    );

    let result = sqlx::query(&sql)
        .bind(to.as_str())
        .bind(remote_handle)
        .bind(Utc::now().timestamp_millis())
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(transition_conflict(pool, id, to).await);
    }

    tracing::debug!("Job {} submitted as {}", id, remote_handle);
    Ok(())
}

/// `IN_FLIGHT -> DONE`: record the alpha the simulation produced
pub async fn mark_done(pool: &SqlitePool, id: JobId, alpha_id: &str) -> Result<()> {
    let to = JobState::Done;
    let sql = format!(
        r#"
        UPDATE simulations
        SET status = ?1, alpha_id = ?2,
            completed_at = MAX(?3, COALESCE(submitted_at, created_at))
        WHERE id = ?4 AND status IN ({})
        "#,
        predecessors_sql(to)
    );

    let result = sqlx::query(&sql)
        .bind(to.as_str())
        .bind(alpha_id)
        .bind(Utc::now().timestamp_millis())
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(transition_conflict(pool, id, to).await);
    }

    tracing::debug!("Job {} done with alpha {}", id, alpha_id);
    Ok(())
}

/// `PENDING | IN_FLIGHT -> FAILED`, keeping any remote handle
pub async fn mark_failed(pool: &SqlitePool, id: JobId, reason: &str) -> Result<()> {
    let to = JobState::Failed;
    let sql = format!(
        r#"
        UPDATE simulations
        SET status = ?1, failure_reason = ?2,
            completed_at = MAX(?3, COALESCE(submitted_at, created_at))
        WHERE id = ?4 AND status IN ({})
        "#,
        predecessors_sql(to)
    );

    let result = sqlx::query(&sql)
        .bind(to.as_str())
        .bind(reason)
        .bind(Utc::now().timestamp_millis())
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(transition_conflict(pool, id, to).await);
    }

    tracing::debug!("Job {} failed: {}", id, reason);
    Ok(())
}

// =============================================================================
// Helper Functions
// =============================================================================

fn predecessors_sql(to: JobState) -> String {
    to.predecessors()
        .iter()
        .map(|s| format!("'{}'", s.as_str()))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Explains why a guarded update touched no row
async fn transition_conflict(pool: &SqlitePool, id: JobId, to: JobState) -> StoreError {
    match find_by_id(pool, id).await {
        Ok(Some(job)) => StoreError::InvalidTransition {
            id,
            from: job.state,
            to,
        },
        Ok(None) => StoreError::NotFound(id),
        Err(e) => e,
    }
}

fn parse_state(s: &str) -> Result<JobState> {
    s.parse()
        .map_err(|e| StoreError::Corrupt(format!("{}", e)))
}

fn from_millis(ms: i64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp_millis(ms)
        .ok_or_else(|| StoreError::Corrupt(format!("timestamp out of range: {}", ms)))
}

// =============================================================================
// Database Row Types
// =============================================================================

#[derive(sqlx::FromRow)]
struct JobRow {
    id: i64,
    expr: String,
    #[sqlx(rename = "type")]
    job_type: String,
    settings: String,
    status: String,
    created_at: i64,
    submitted_at: Option<i64>,
    remote_handle: Option<String>,
    completed_at: Option<i64>,
    alpha_id: Option<String>,
    failure_reason: Option<String>,
}

impl TryFrom<JobRow> for Job {
    type Error = StoreError;

    fn try_from(row: JobRow) -> Result<Self> {
        let settings = serde_json::from_str(&row.settings).map_err(|e| {
            StoreError::Corrupt(format!("job {} has unreadable settings: {}", row.id, e))
        })?;

        Ok(Job {
            id: row.id,
            expression: row.expr,
            job_type: row.job_type,
            settings,
            state: parse_state(&row.status)?,
            remote_handle: row.remote_handle,
            artifact_id: row.alpha_id,
            failure_reason: row.failure_reason,
            created_at: from_millis(row.created_at)?,
            submitted_at: row.submitted_at.map(from_millis).transpose()?,
            completed_at: row.completed_at.map(from_millis).transpose()?,
        })
    }
}
