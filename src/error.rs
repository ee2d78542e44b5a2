// =====================================================
// ERROR TYPES
// Failure taxonomy shared by the engines and the local store
// =====================================================

use thiserror::Error;

/// Errors surfaced across the engine boundary.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DbSyncError {
    /// One or both connection configs are absent
    #[error("Connection configuration missing: {0}")]
    ConfigurationMissing(String),

    /// Session open or keepalive failure
    #[error("Connection failed: {0}")]
    Connectivity(String),

    /// A metadata, count or data query failed
    #[error("Query failed: {0}")]
    Query(String),

    /// Target table absent, or nothing left to write after column filtering
    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),

    /// Local store failure
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Operation cancelled")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, DbSyncError>;

impl From<sqlx::Error> for DbSyncError {
    fn from(err: sqlx::Error) -> Self {
        DbSyncError::Query(err.to_string())
    }
}

impl From<serde_json::Error> for DbSyncError {
    fn from(err: serde_json::Error) -> Self {
        DbSyncError::Serialization(err.to_string())
    }
}

impl DbSyncError {
    pub(crate) fn storage(context: &str, err: impl std::fmt::Display) -> Self {
        DbSyncError::Storage(format!("{}: {}", context, err))
    }
}
