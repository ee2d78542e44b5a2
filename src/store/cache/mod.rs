// =====================================================
// COMPARISON CACHE
// Aggregate reports keyed by the ordered pair of
// connection fingerprints; one live entry per pair
// =====================================================

use crate::db_types::{ComparisonReport, ConnectionConfig, TableDiffEntry};
use crate::error::{DbSyncError, Result};
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{sqlite::SqliteRow, Pool, Row, Sqlite};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Reversible, password-free identity of a connection.
pub fn config_fingerprint(config: &ConnectionConfig) -> String {
    let identity = format!(
        "{}:{}:{}:{}",
        config.host, config.port, config.user, config.database
    );
    BASE64_STANDARD.encode(identity)
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
    pub id: i64,
    pub fingerprint1: String,
    pub fingerprint2: String,
    pub report: ComparisonReport,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct ComparisonCache {
    pool: Pool<Sqlite>,
    write_lock: Arc<Mutex<()>>,
}

impl ComparisonCache {
    pub fn new(pool: Pool<Sqlite>, write_lock: Arc<Mutex<()>>) -> Self {
        Self { pool, write_lock }
    }

    /// Most recent entry for exactly `(config1, config2)`; swapped order is a miss.
    pub async fn get(
        &self,
        config1: &ConnectionConfig,
        config2: &ConnectionConfig,
    ) -> Result<Option<CacheEntry>> {
        let fingerprint1 = config_fingerprint(config1);
        let fingerprint2 = config_fingerprint(config2);

        let row = sqlx::query(
            r#"
            SELECT id, db1_config_hash, db2_config_hash, comparison_data,
                   db1_display_name, db2_display_name, created_at
            FROM table_comparison_cache
            WHERE db1_config_hash = ? AND db2_config_hash = ?
            ORDER BY created_at DESC, id DESC
            LIMIT 1
            "#,
        )
        .bind(&fingerprint1)
        .bind(&fingerprint2)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DbSyncError::storage("Failed to read comparison cache", e))?;

        match row {
            Some(row) => Ok(Some(row_to_cache_entry(&row, config1, config2)?)),
            None => Ok(None),
        }
    }

    /// Replaces any entry for the pair with `report`.
    pub async fn put(
        &self,
        config1: &ConnectionConfig,
        config2: &ConnectionConfig,
        report: &ComparisonReport,
    ) -> Result<i64> {
        let fingerprint1 = config_fingerprint(config1);
        let fingerprint2 = config_fingerprint(config2);
        let payload = serde_json::to_string(report)?;

        let _guard = self.write_lock.lock().await;
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DbSyncError::storage("Failed to begin cache transaction", e))?;

        let removed = sqlx::query(
            "DELETE FROM table_comparison_cache WHERE db1_config_hash = ? AND db2_config_hash = ?",
        )
        .bind(&fingerprint1)
        .bind(&fingerprint2)
        .execute(&mut *tx)
        .await
        .map_err(|e| DbSyncError::storage("Failed to clear comparison cache", e))?
        .rows_affected();

        let id = sqlx::query(
            r#"
            INSERT INTO table_comparison_cache
                (db1_config_hash, db2_config_hash, comparison_data,
                 db1_display_name, db2_display_name, total_tables, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&fingerprint1)
        .bind(&fingerprint2)
        .bind(payload)
        .bind(&report.db1_display_name)
        .bind(&report.db2_display_name)
        .bind(crate::db::helpers::usize_to_i64(report.total_tables))
        .bind(Utc::now())
        .execute(&mut *tx)
        .await
        .map_err(|e| DbSyncError::storage("Failed to write comparison cache", e))?
        .last_insert_rowid();

        tx.commit()
            .await
            .map_err(|e| DbSyncError::storage("Failed to commit comparison cache", e))?;

        log::debug!(
            "Cached comparison {} -> {} (replaced {} entries)",
            report.db1_name,
            report.db2_name,
            removed
        );
        Ok(id)
    }

    pub async fn clear(&self, config1: &ConnectionConfig, config2: &ConnectionConfig) -> Result<u64> {
        let _guard = self.write_lock.lock().await;
        let result = sqlx::query(
            "DELETE FROM table_comparison_cache WHERE db1_config_hash = ? AND db2_config_hash = ?",
        )
        .bind(config_fingerprint(config1))
        .bind(config_fingerprint(config2))
        .execute(&self.pool)
        .await
        .map_err(|e| DbSyncError::storage("Failed to clear comparison cache", e))?;
        Ok(result.rows_affected())
    }

    pub async fn invalidate_all(&self) -> Result<u64> {
        let _guard = self.write_lock.lock().await;
        let result = sqlx::query("DELETE FROM table_comparison_cache")
            .execute(&self.pool)
            .await
            .map_err(|e| DbSyncError::storage("Failed to invalidate comparison cache", e))?;
        log::info!("Comparison cache invalidated ({} entries)", result.rows_affected());
        Ok(result.rows_affected())
    }

    pub async fn count(&self) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS cnt FROM table_comparison_cache")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| DbSyncError::storage("Failed to count cache entries", e))?;
        Ok(row.try_get::<i64, _>("cnt").unwrap_or(0))
    }
}

fn row_to_cache_entry(
    row: &SqliteRow,
    config1: &ConnectionConfig,
    config2: &ConnectionConfig,
) -> Result<CacheEntry> {
    let payload: String = row
        .try_get("comparison_data")
        .map_err(|e| DbSyncError::storage("Corrupt cache row", e))?;
    let created_at: DateTime<Utc> = row.try_get("created_at").unwrap_or_else(|_| Utc::now());

    let report = match serde_json::from_str::<ComparisonReport>(&payload) {
        Ok(report) => report,
        // Rows written before reports were stored whole hold only the entry list.
        Err(_) => {
            let entries = serde_json::from_str::<Vec<TableDiffEntry>>(&payload)?;
            let display1 = row
                .try_get::<Option<String>, _>("db1_display_name")
                .ok()
                .flatten();
            let display2 = row
                .try_get::<Option<String>, _>("db2_display_name")
                .ok()
                .flatten();
            ComparisonReport {
                total_tables: entries.len(),
                entries,
                db1_name: config1.database.clone(),
                db2_name: config2.database.clone(),
                db1_display_name: display1.unwrap_or_else(|| config1.display_label()),
                db2_display_name: display2.unwrap_or_else(|| config2.display_label()),
                from_cache: true,
                generated_at: created_at,
            }
        }
    };

    Ok(CacheEntry {
        id: row.try_get("id").unwrap_or_default(),
        fingerprint1: row.try_get("db1_config_hash").unwrap_or_default(),
        fingerprint2: row.try_get("db2_config_hash").unwrap_or_default(),
        report,
        created_at,
    })
}

#[cfg(test)]
mod tests;
