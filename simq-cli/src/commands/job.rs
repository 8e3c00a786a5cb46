//! Job command handlers
//!
//! Handles all job-related CLI commands including enqueueing,
//! state counts, listing and viewing details.

use anyhow::{Context, Result};
use colored::*;
use serde_json::Value as JsonValue;
use simq_core::domain::alpha::CheckVerdict;
use simq_core::domain::job::{Job, JobId, NewJob};
use simq_core::domain::lifecycle::JobState;
use simq_store::SqlitePool;
use simq_store::repository::{alpha_repository, simulation_repository};
use std::path::PathBuf;

/// Queue expressions given as arguments and/or read from a file
pub async fn enqueue(
    pool: &SqlitePool,
    expressions: Vec<String>,
    file: Option<PathBuf>,
    job_type: String,
    settings: Option<String>,
) -> Result<()> {
    let mut all = expressions;
    if let Some(path) = file {
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read expressions from {}", path.display()))?;
        all.extend(parse_expressions(&content));
    }

    if all.is_empty() {
        anyhow::bail!("No expressions given; pass them as arguments or with --file");
    }

    let settings = match settings {
        Some(raw) => parse_settings(&raw)?,
        None => JsonValue::Object(Default::default()),
    };

    let jobs: Vec<NewJob> = all
        .into_iter()
        .map(|expression| NewJob {
            expression,
            job_type: job_type.clone(),
            settings: settings.clone(),
        })
        .collect();

    let ids = simulation_repository::enqueue_many(pool, jobs)
        .await
        .context("Failed to enqueue expressions")?;

    println!(
        "{} Queued {} expression(s)",
        "✓".green(),
        ids.len().to_string().bold()
    );
    if let (Some(first), Some(last)) = (ids.first(), ids.last()) {
        println!("  IDs: {}", format!("{}..={}", first, last).dimmed());
    }

    Ok(())
}

/// Show job counts per state
pub async fn status(pool: &SqlitePool) -> Result<()> {
    let counts = simulation_repository::count_by_state(pool).await?;
    let alphas = alpha_repository::count(pool).await?;

    println!("{}", "Queue Status:".bold());
    for state in JobState::ALL {
        println!(
            "  {:<10} {}",
            colorize_state(state),
            counts.get(state)
        );
    }
    println!("  {:<10} {}", "TOTAL".bold(), counts.total());
    println!("  {:<10} {}", "ALPHAS".cyan(), alphas);

    Ok(())
}

/// List jobs, optionally only those in one state
pub async fn list_jobs(pool: &SqlitePool, state: Option<JobState>) -> Result<()> {
    let jobs = match state {
        Some(state) => simulation_repository::find_by_state(pool, state, None).await?,
        None => simulation_repository::list_all(pool).await?,
    };

    if jobs.is_empty() {
        println!("{}", "No jobs found.".yellow());
    } else {
        println!("{}", format!("Found {} job(s):", jobs.len()).bold());
        println!();
        for job in jobs {
            print_job_summary(&job);
        }
    }

    Ok(())
}

/// Get and display a single job
pub async fn show_job(pool: &SqlitePool, id: JobId) -> Result<()> {
    let job = simulation_repository::find_by_id(pool, id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("Job {} not found", id))?;

    print_job_details(&job);

    if let Some(alpha_id) = &job.artifact_id {
        if let Some((alpha, verdict)) = alpha_repository::find_by_id(pool, alpha_id).await? {
            println!("\n{}", "Alpha:".bold());
            println!("  ID:      {}", alpha.id.cyan());
            if let Some(status) = &alpha.status {
                println!("  Status:  {}", status);
            }
            if let Some(grade) = &alpha.grade {
                println!("  Grade:   {}", grade);
            }
            println!("  Checks:  {}", colorize_verdict(verdict));
        }
    }

    Ok(())
}

/// Expressions from a file: one per line, blank lines and `#` comments skipped
fn parse_expressions(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}

/// Setting overrides must be a JSON object
fn parse_settings(raw: &str) -> Result<JsonValue> {
    let value: JsonValue = serde_json::from_str(raw).context("Settings must be valid JSON")?;
    if !value.is_object() {
        anyhow::bail!("Settings must be a JSON object, got: {}", raw);
    }
    Ok(value)
}

/// Print a job summary
fn print_job_summary(job: &Job) {
    println!(
        "  {} Job {} {}",
        "▸".cyan(),
        job.id.to_string().bold(),
        colorize_state(job.state)
    );
    println!("    Expr:     {}", job.short_expression(70));
    println!(
        "    Created:  {}",
        job.created_at
            .format("%Y-%m-%d %H:%M:%S")
            .to_string()
            .dimmed()
    );
    if let Some(alpha) = &job.artifact_id {
        println!("    Alpha:    {}", alpha.cyan());
    }
    if let Some(reason) = &job.failure_reason {
        println!("    Reason:   {}", reason.red());
    }
    println!();
}

/// Print detailed job information
fn print_job_details(job: &Job) {
    println!("{}", "Job Details:".bold());
    println!("  ID:          {}", job.id.to_string().cyan());
    println!("  Status:      {}", colorize_state(job.state));
    println!("  Type:        {}", job.job_type);
    println!("  Expression:  {}", job.expression);
    println!(
        "  Created:     {}",
        job.created_at.format("%Y-%m-%d %H:%M:%S")
    );

    if let Some(submitted) = job.submitted_at {
        println!("  Submitted:   {}", submitted.format("%Y-%m-%d %H:%M:%S"));
    }

    if let Some(handle) = &job.remote_handle {
        println!("  Handle:      {}", handle.dimmed());
    }

    if let Some(completed) = job.completed_at {
        println!("  Completed:   {}", completed.format("%Y-%m-%d %H:%M:%S"));

        // Calculate duration
        if let Some(submitted) = job.submitted_at {
            let duration = completed.signed_duration_since(submitted);
            println!("  Duration:    {}s", duration.num_seconds());
        }
    }

    if job.settings.as_object().is_some_and(|s| !s.is_empty()) {
        println!("\n{}", "Settings:".bold());
        if let Some(settings) = job.settings.as_object() {
            for (key, value) in settings {
                println!("  {} = {}", key.cyan(), value);
            }
        }
    }

    if let Some(reason) = &job.failure_reason {
        println!("\n{}", "Error:".bold());
        println!("{}", reason.red());
    }
}

/// Colorize job state for display
fn colorize_state(state: JobState) -> ColoredString {
    let text = state.as_str();
    match state {
        JobState::Pending => text.yellow(),
        JobState::InFlight => text.cyan(),
        JobState::Done => text.green(),
        JobState::Failed => text.red(),
    }
}

fn colorize_verdict(verdict: CheckVerdict) -> ColoredString {
    match verdict {
        CheckVerdict::Pass => verdict.as_str().green(),
        CheckVerdict::Fail => verdict.as_str().red(),
    }
}
