// SQLite Connection Pool Setup

use crate::error::map_sqlx_error;
use crate::migration::run_migrations;
use grabgrub_core::error::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;

/// Create SQLite connection pool with WAL mode
///
/// In-memory databases are private to a connection, so they get exactly one.
pub async fn create_pool(database_url: &str) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(database_url)
        .map_err(map_sqlx_error)?
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_secs(5))
        .create_if_missing(true);

    let memory = is_memory_url(database_url);
    let max_connections = if memory { 1 } else { 4 };

    let mut pool_options = SqlitePoolOptions::new().max_connections(max_connections);
    if memory {
        // Closing the only connection would discard the database
        pool_options = pool_options.idle_timeout(None).max_lifetime(None);
    }

    let pool = pool_options
        .connect_with(options)
        .await
        .map_err(map_sqlx_error)?;

    debug!(database_url, max_connections, "SQLite pool ready");
    Ok(pool)
}

/// Open (creating if needed) the database file and bring its schema up to date
pub async fn open_database(path: &Path) -> Result<SqlitePool> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let pool = create_pool(&database_url(path)).await?;
    run_migrations(&pool).await?;
    Ok(pool)
}

/// `sqlite://` URL for a file path
pub fn database_url(path: &Path) -> String {
    format!("sqlite://{}", path.display())
}

fn is_memory_url(database_url: &str) -> bool {
    database_url.contains(":memory:") || database_url.contains("mode=memory")
}
