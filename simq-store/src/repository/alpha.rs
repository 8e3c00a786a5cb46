//! Alpha Repository
//!
//! Persists the artifacts produced by completed simulations.

use chrono::Utc;
use simq_core::domain::alpha::{Alpha, CheckVerdict};
use sqlx::SqlitePool;

use crate::error::{Result, StoreError};

/// Save an alpha, replacing any earlier copy
///
/// Replacing keeps collection idempotent when a job is collected again after
/// a crash between saving the alpha and marking the job done.
pub async fn save(pool: &SqlitePool, alpha: &Alpha) -> Result<()> {
    sqlx::query(
        r#"
        INSERT OR REPLACE INTO alphas
            (id, settings, status, grade, stage, is_summary, train, test, checks, collected_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
        "#,
    )
    .bind(&alpha.id)
    .bind(serde_json::to_string(&alpha.settings)?)
    .bind(&alpha.status)
    .bind(&alpha.grade)
    .bind(&alpha.stage)
    .bind(serde_json::to_string(&alpha.in_sample)?)
    .bind(serde_json::to_string(&alpha.train)?)
    .bind(serde_json::to_string(&alpha.test)?)
    .bind(alpha.check_verdict().as_str())
    .bind(Utc::now().timestamp_millis())
    .execute(pool)
    .await?;

    Ok(())
}

/// Find an alpha by ID, with its stored check verdict
pub async fn find_by_id(pool: &SqlitePool, id: &str) -> Result<Option<(Alpha, CheckVerdict)>> {
    let row = sqlx::query_as::<_, AlphaRow>(
        r#"
        SELECT id, settings, status, grade, stage, is_summary, train, test, checks
        FROM alphas
        WHERE id = ?1
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    row.map(AlphaRow::into_alpha).transpose()
}

/// Number of collected alphas
pub async fn count(pool: &SqlitePool) -> Result<u64> {
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM alphas")
        .fetch_one(pool)
        .await?;

    Ok(count.max(0) as u64)
}

// =============================================================================
// Database Row Types
// =============================================================================

#[derive(sqlx::FromRow)]
struct AlphaRow {
    id: String,
    settings: Option<String>,
    status: Option<String>,
    grade: Option<String>,
    stage: Option<String>,
    is_summary: Option<String>,
    train: Option<String>,
    test: Option<String>,
    checks: String,
}

impl AlphaRow {
    fn into_alpha(self) -> Result<(Alpha, CheckVerdict)> {
        let verdict = match self.checks.as_str() {
            "PASS" => CheckVerdict::Pass,
            "FAIL" => CheckVerdict::Fail,
            other => {
                return Err(StoreError::Corrupt(format!(
                    "alpha {} has unknown check verdict {}",
                    self.id, other
                )));
            }
        };

        let alpha = Alpha {
            settings: json_column(self.settings)?,
            status: self.status,
            grade: self.grade,
            stage: self.stage,
            in_sample: json_column(self.is_summary)?,
            train: json_column(self.train)?,
            test: json_column(self.test)?,
            id: self.id,
        };

        Ok((alpha, verdict))
    }
}

fn json_column(value: Option<String>) -> Result<serde_json::Value> {
    match value {
        Some(text) => Ok(serde_json::from_str(&text)?),
        None => Ok(serde_json::Value::Null),
    }
}
