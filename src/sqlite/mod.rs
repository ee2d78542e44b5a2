// =====================================================
// LOCAL SQLITE POOL
// Connection setup for the history/cache/settings store
// =====================================================

use crate::error::{DbSyncError, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::ConnectOptions;
use sqlx::{Pool, Sqlite};
use std::fs;
use std::path::Path;
use std::str::FromStr;

fn build_connect_options(db_path: &Path) -> SqliteConnectOptions {
    SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .foreign_keys(true)
        .log_statements(log::LevelFilter::Debug)
}

pub async fn create_pool(db_path: &Path) -> Result<Pool<Sqlite>> {
    if db_path.as_os_str().is_empty() {
        return Err(DbSyncError::InvalidInput(
            "Database file path is required".to_string(),
        ));
    }

    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent)
                .map_err(|e| DbSyncError::storage("Failed to create storage directory", e))?;
        }
    }

    SqlitePoolOptions::new()
        .max_connections(5)
        .min_connections(1)
        .acquire_timeout(std::time::Duration::from_secs(10))
        .idle_timeout(std::time::Duration::from_secs(300))
        .max_lifetime(std::time::Duration::from_secs(1800))
        .connect_with(build_connect_options(db_path))
        .await
        .map_err(|e| DbSyncError::storage("Failed to create SQLite pool", e))
}

/// Single long-lived connection so the in-memory database survives for the pool's lifetime.
pub async fn create_memory_pool() -> Result<Pool<Sqlite>> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")
        .map_err(|e| DbSyncError::storage("Invalid in-memory SQLite URL", e))?
        .log_statements(log::LevelFilter::Debug);

    SqlitePoolOptions::new()
        .max_connections(1)
        .min_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await
        .map_err(|e| DbSyncError::storage("Failed to create in-memory SQLite pool", e))
}
