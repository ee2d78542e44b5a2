// =====================================================
// LOCAL STORE
// SQLite-backed persistence for connections, projects,
// comparison history, the comparison cache, settings
// and saved table filters
// =====================================================

pub mod cache;
pub mod connections;
pub mod filters;
pub mod history;
pub mod projects;
pub mod settings;

pub use cache::{config_fingerprint, CacheEntry, ComparisonCache};
pub use connections::{ConnectionStore, ConnectionSummary};
pub use filters::{decode_filter_payload, encode_filter_payload, FilterStore};
pub use history::{ComparisonHistoryRecord, HistoryStore};
pub use projects::{Project, ProjectStore};
pub use settings::SettingsStore;

use crate::config::{default_local_db_path, EngineSettings, ENGINE_SETTINGS_KEY};
use crate::error::{DbSyncError, Result};
use sqlx::{Pool, Row, Sqlite};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;

const SCHEMA_STATEMENTS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS projects (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL UNIQUE,
        description TEXT,
        created_at DATETIME NOT NULL,
        updated_at DATETIME NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS db_configs (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        config_name TEXT NOT NULL,
        connection_name TEXT,
        host TEXT NOT NULL,
        port INTEGER NOT NULL,
        user TEXT NOT NULL,
        password TEXT,
        database_name TEXT NOT NULL,
        is_active INTEGER DEFAULT 1,
        created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
        updated_at DATETIME DEFAULT CURRENT_TIMESTAMP
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS comparison_history (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        db1_name TEXT NOT NULL,
        db2_name TEXT NOT NULL,
        total_tables INTEGER NOT NULL,
        different_tables INTEGER NOT NULL,
        same_tables INTEGER NOT NULL,
        missing_tables INTEGER NOT NULL,
        comparison_data TEXT NOT NULL,
        created_at DATETIME DEFAULT CURRENT_TIMESTAMP
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS app_settings (
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL,
        updated_at DATETIME DEFAULT CURRENT_TIMESTAMP
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS table_comparison_cache (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        db1_config_hash TEXT NOT NULL,
        db2_config_hash TEXT NOT NULL,
        comparison_data TEXT NOT NULL,
        db1_display_name TEXT,
        db2_display_name TEXT,
        total_tables INTEGER NOT NULL,
        created_at DATETIME DEFAULT CURRENT_TIMESTAMP
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS table_filters (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        project_id INTEGER NOT NULL,
        database_name TEXT NOT NULL,
        table_name TEXT NOT NULL,
        filter_data TEXT NOT NULL,
        updated_at DATETIME NOT NULL,
        UNIQUE(project_id, database_name, table_name)
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_cache_pair ON table_comparison_cache(db1_config_hash, db2_config_hash)",
    "CREATE INDEX IF NOT EXISTS idx_history_created ON comparison_history(created_at)",
];

/// Columns added after the first released schema: (table, column, definition).
const COLUMN_MIGRATIONS: &[(&str, &str, &str)] = &[
    ("db_configs", "connection_name", "TEXT"),
    ("db_configs", "project_id", "INTEGER NOT NULL DEFAULT 0"),
    ("comparison_history", "db1_display_name", "TEXT"),
    ("comparison_history", "db2_display_name", "TEXT"),
];

pub struct LocalStore {
    pool: Pool<Sqlite>,
    cache_write_lock: Arc<Mutex<()>>,
}

impl LocalStore {
    pub async fn open(path: &Path) -> Result<Self> {
        log::info!("Opening local store at {}", path.display());
        let pool = crate::sqlite::create_pool(path).await?;
        Self::from_pool(pool).await
    }

    pub fn default_path() -> Option<PathBuf> {
        default_local_db_path()
    }

    pub async fn open_default() -> Result<Self> {
        let path = Self::default_path().ok_or_else(|| {
            DbSyncError::Storage("Could not resolve the application data directory".to_string())
        })?;
        Self::open(&path).await
    }

    pub async fn open_in_memory() -> Result<Self> {
        let pool = crate::sqlite::create_memory_pool().await?;
        Self::from_pool(pool).await
    }

    pub async fn from_pool(pool: Pool<Sqlite>) -> Result<Self> {
        let store = Self {
            pool,
            cache_write_lock: Arc::new(Mutex::new(())),
        };
        store.init_schema().await?;
        Ok(store)
    }

    async fn init_schema(&self) -> Result<()> {
        for statement in SCHEMA_STATEMENTS {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(|e| DbSyncError::storage("Failed to init local schema", e))?;
        }

        self.run_migrations().await?;

        let default_settings = serde_json::to_string(&EngineSettings::default())?;
        sqlx::query(
            r#"
            INSERT OR IGNORE INTO app_settings (key, value, updated_at)
            VALUES (?, ?, ?)
            "#,
        )
        .bind(ENGINE_SETTINGS_KEY)
        .bind(default_settings)
        .bind(chrono::Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|e| DbSyncError::storage("Failed to seed engine settings", e))?;

        Ok(())
    }

    async fn run_migrations(&self) -> Result<()> {
        for (table, column, definition) in COLUMN_MIGRATIONS {
            if self.column_exists(table, column).await? {
                continue;
            }
            log::info!("Adding column {}.{}", table, column);
            sqlx::query(&format!(
                "ALTER TABLE {} ADD COLUMN {} {}",
                table, column, definition
            ))
            .execute(&self.pool)
            .await
            .map_err(|e| DbSyncError::storage("Failed to migrate local schema", e))?;
        }
        Ok(())
    }

    pub(crate) async fn column_exists(&self, table: &str, column: &str) -> Result<bool> {
        let rows = sqlx::query(&format!("PRAGMA table_info(\"{}\")", table))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| DbSyncError::storage("Failed to read table info", e))?;

        Ok(rows
            .iter()
            .any(|r| r.try_get::<String, _>("name").map(|n| n == column).unwrap_or(false)))
    }

    pub fn get_pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    pub fn connections(&self) -> ConnectionStore {
        ConnectionStore::new(self.pool.clone())
    }

    pub fn projects(&self) -> ProjectStore {
        ProjectStore::new(self.pool.clone())
    }

    pub fn history(&self) -> HistoryStore {
        HistoryStore::new(self.pool.clone())
    }

    pub fn cache(&self) -> ComparisonCache {
        ComparisonCache::new(self.pool.clone(), Arc::clone(&self.cache_write_lock))
    }

    pub fn settings(&self) -> SettingsStore {
        SettingsStore::new(self.pool.clone())
    }

    pub fn filters(&self) -> FilterStore {
        FilterStore::new(self.pool.clone())
    }

    pub async fn close(&self) {
        self.pool.close().await;
        log::info!("Local store closed");
    }
}
