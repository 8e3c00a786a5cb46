use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

pub async fn create_pool(path: impl AsRef<Path>) -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_secs(5));

    SqlitePoolOptions::new()
        .max_connections(5)
        .acquire_timeout(Duration::from_secs(5))
        .connect_with(options)
        .await
}

/// Single-connection in-memory database; the connection is never recycled
/// because that would drop the database with it.
pub async fn create_memory_pool() -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")?;

    SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await
}

/// Opens the queue file, creating and migrating it if needed
pub async fn open(path: impl AsRef<Path>) -> Result<SqlitePool, sqlx::Error> {
    let pool = create_pool(path).await?;
    run_migrations(&pool).await?;
    Ok(pool)
}

/// Migrated in-memory queue, for tests
pub async fn open_in_memory() -> Result<SqlitePool, sqlx::Error> {
    let pool = create_memory_pool().await?;
    run_migrations(&pool).await?;
    Ok(pool)
}

pub async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    // Create simulations table (the job queue)
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS simulations (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            expr TEXT NOT NULL,
            type TEXT NOT NULL,
            settings TEXT NOT NULL DEFAULT '{}',
            status TEXT NOT NULL
                CHECK (status IN ('PENDING', 'IN_FLIGHT', 'DONE', 'FAILED')),
            created_at INTEGER NOT NULL,
            submitted_at INTEGER,
            remote_handle TEXT,
            completed_at INTEGER,
            alpha_id TEXT,
            failure_reason TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_simulations_status ON simulations(status, id)")
        .execute(pool)
        .await?;

    // A remote handle, once recorded, is the only way back to the remote job
    sqlx::query(
        r#"
        CREATE TRIGGER IF NOT EXISTS simulations_remote_handle_immutable
        BEFORE UPDATE OF remote_handle ON simulations
        WHEN OLD.remote_handle IS NOT NULL
             AND (NEW.remote_handle IS NULL OR NEW.remote_handle <> OLD.remote_handle)
        BEGIN
            SELECT RAISE(ABORT, 'remote_handle cannot be changed once set');
        END
        "#,
    )
    .execute(pool)
    .await?;

    // Create alphas table (collected artifacts)
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS alphas (
            id TEXT PRIMARY KEY,
            settings TEXT,
            status TEXT,
            grade TEXT,
            stage TEXT,
            is_summary TEXT,
            train TEXT,
            test TEXT,
            checks TEXT NOT NULL,
            collected_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Create fields table (data field catalog)
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS fields (
            id TEXT PRIMARY KEY,
            type TEXT NOT NULL,
            dataset_id TEXT NOT NULL,
            category_id TEXT,
            subcategory_id TEXT,
            universe TEXT NOT NULL,
            region TEXT,
            delay INTEGER,
            description TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_fields_type ON fields(type)")
        .execute(pool)
        .await?;

    tracing::debug!("Queue migrations completed successfully");
    Ok(())
}
