//! Commands module
//!
//! Defines all CLI commands and their handlers.

mod field;
mod job;

pub use field::CrawlArgs;

use anyhow::Result;
use clap::Subcommand;
use simq_core::domain::job::{DEFAULT_JOB_TYPE, JobId};
use simq_core::domain::lifecycle::JobState;
use std::path::PathBuf;

use crate::config::Config;

/// Top-level CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Queue expressions for simulation
    Enqueue {
        /// Expressions to queue
        expressions: Vec<String>,

        /// Read expressions from a file, one per line
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// Simulation type
        #[arg(short = 't', long = "type", default_value = DEFAULT_JOB_TYPE)]
        job_type: String,

        /// Setting overrides as a JSON object (e.g. '{"decay": 4}')
        #[arg(short, long)]
        settings: Option<String>,
    },
    /// Show how many jobs are in each state
    Status,
    /// List jobs
    Jobs {
        /// Only jobs in this state (pending, in_flight, done, failed)
        #[arg(short, long)]
        state: Option<JobState>,
    },
    /// Show one job and its alpha
    Show {
        /// Job ID
        id: JobId,
    },
    /// Import the data-field catalog from the research API
    Crawl(CrawlArgs),
    /// List imported data fields
    Fields {
        /// Only fields of this type (e.g. MATRIX, VECTOR)
        #[arg(short = 't', long = "type")]
        field_type: Option<String>,
    },
}

/// Handle a CLI command
///
/// Routes the command to the appropriate handler module.
///
/// # Arguments
/// * `command` - The command to execute
/// * `config` - The CLI configuration
///
/// # Returns
/// Result indicating success or failure
pub async fn handle_command(command: Commands, config: &Config) -> Result<()> {
    let pool = config.open_queue().await?;

    match command {
        Commands::Enqueue {
            expressions,
            file,
            job_type,
            settings,
        } => job::enqueue(&pool, expressions, file, job_type, settings).await,
        Commands::Status => job::status(&pool).await,
        Commands::Jobs { state } => job::list_jobs(&pool, state).await,
        Commands::Show { id } => job::show_job(&pool, id).await,
        Commands::Crawl(args) => field::crawl(&pool, args).await,
        Commands::Fields { field_type } => field::list_fields(&pool, field_type).await,
    }
}
