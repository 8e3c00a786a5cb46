//! Data field command handlers
//!
//! Imports the field catalog from the research API and lists what was imported.

use anyhow::{Context, Result};
use clap::Args;
use colored::*;
use simq_client::{BrainClient, Credentials, DEFAULT_API_URL};
use simq_core::domain::field::DataField;
use simq_core::dto::field::DataFieldQuery;
use simq_store::SqlitePool;
use simq_store::repository::field_repository;

/// Options of the `crawl` command
#[derive(Args)]
pub struct CrawlArgs {
    /// Account used to sign in to the research API
    #[arg(long, env = "WQB_USER")]
    pub user: String,

    #[arg(long, env = "WQB_PASS", hide_env_values = true)]
    pub password: String,

    /// Research API base URL
    #[arg(long, env = "SIMQ_API_URL", default_value = DEFAULT_API_URL)]
    pub api_url: String,

    #[arg(long, default_value = "USA")]
    pub region: String,

    #[arg(long, default_value_t = 1)]
    pub delay: i64,

    #[arg(long, default_value = "TOP3000")]
    pub universe: String,

    #[arg(long, default_value = "EQUITY")]
    pub instrument_type: String,

    /// Only fields of this type (e.g. MATRIX, VECTOR)
    #[arg(short = 't', long = "type")]
    pub data_type: Option<String>,

    /// Only fields of this dataset
    #[arg(long)]
    pub dataset: Option<String>,

    /// Free-text search
    #[arg(long)]
    pub search: Option<String>,

    /// Maximum number of fields to import
    #[arg(long, default_value_t = 200)]
    pub limit: u64,

    /// Fields requested per page
    #[arg(long, default_value_t = 50)]
    pub chunk_size: u32,
}

impl CrawlArgs {
    fn query(&self) -> DataFieldQuery {
        DataFieldQuery {
            region: self.region.clone(),
            delay: self.delay,
            universe: self.universe.clone(),
            instrument_type: self.instrument_type.clone(),
            data_type: self.data_type.clone(),
            dataset_id: self.dataset.clone(),
            search: self.search.clone(),
            chunk_size: self.chunk_size,
            limit: self.limit,
        }
    }
}

/// Fetch the field catalog and store it
pub async fn crawl(pool: &SqlitePool, args: CrawlArgs) -> Result<()> {
    let query = args.query();
    let client = BrainClient::new(args.api_url, Credentials::new(args.user, args.password))
        .context("Failed to build HTTP client")?;

    println!(
        "{} Crawling fields ({} / delay {} / {})",
        "▸".cyan(),
        query.region,
        query.delay,
        query.universe
    );

    let fields = client
        .data_fields(&query)
        .await
        .context("Failed to fetch data fields")?;

    let written = field_repository::insert_many(pool, &fields)
        .await
        .context("Failed to store data fields")?;

    println!("{} {} fields imported.", "✓".green(), written.to_string().bold());

    Ok(())
}

/// List imported fields
pub async fn list_fields(pool: &SqlitePool, field_type: Option<String>) -> Result<()> {
    let fields = field_repository::find_by_type(pool, field_type.as_deref()).await?;

    if fields.is_empty() {
        println!("{}", "No fields found.".yellow());
    } else {
        println!("{}", format!("Found {} field(s):", fields.len()).bold());
        println!();
        for field in fields {
            print_field(&field);
        }
    }

    Ok(())
}

fn print_field(field: &DataField) {
    println!(
        "  {} {} {}",
        "▸".cyan(),
        field.id.bold(),
        format!("[{}]", field.field_type).dimmed()
    );
    println!("    Dataset:  {}", field.dataset_id);
    if let Some(description) = &field.description {
        println!("    {}", description.dimmed());
    }
}
