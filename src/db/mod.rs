/// Database layer for Oxbow
///
/// Manages the SQLite pool, embedded migrations, and typed access to the
/// journal, Mirror, generation-request, Day 1 and user tables.

pub mod day1;
pub mod journals;
pub mod mirrors;
pub mod models;
pub mod requests;
pub mod users;

pub use day1::Day1ProgressStore;
pub use journals::JournalStore;
pub use mirrors::MirrorStore;
pub use models::*;
pub use requests::GenerationRequestStore;
pub use users::UserStore;

use crate::error::{OxbowError, OxbowResult};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;

/// Database connection options
#[derive(Debug, Clone)]
pub struct DatabaseOptions {
    pub max_connections: u32,
    pub enable_wal: bool,
}

impl Default for DatabaseOptions {
    fn default() -> Self {
        Self {
            max_connections: 10,
            enable_wal: true,
        }
    }
}

/// Create a SQLite connection pool
pub async fn create_pool(path: &Path, options: DatabaseOptions) -> OxbowResult<SqlitePool> {
    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }

    let pool = SqlitePoolOptions::new()
        .max_connections(options.max_connections)
        .connect_with(
            SqliteConnectOptions::new()
                .filename(path)
                .create_if_missing(true)
                .journal_mode(if options.enable_wal {
                    SqliteJournalMode::Wal
                } else {
                    SqliteJournalMode::Delete
                })
                .foreign_keys(true)
                .busy_timeout(std::time::Duration::from_secs(5)),
        )
        .await
        .map_err(OxbowError::Database)?;

    Ok(pool)
}

/// Run migrations embedded at compile time from ./migrations
pub async fn run_migrations(pool: &SqlitePool) -> OxbowResult<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| OxbowError::Internal(format!("Migration failed: {}", e)))?;

    Ok(())
}

/// Test database connection
pub async fn test_connection(pool: &SqlitePool) -> OxbowResult<()> {
    sqlx::query("SELECT 1")
        .execute(pool)
        .await
        .map_err(OxbowError::Database)?;

    Ok(())
}

/// Single-connection in-memory pool with the schema applied
///
/// One connection keeps every query on the same in-memory database.
pub async fn memory_pool() -> OxbowResult<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true))
        .await?;

    run_migrations(&pool).await?;
    Ok(pool)
}
