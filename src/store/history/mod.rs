// =====================================================
// COMPARISON HISTORY
// Append-only log of aggregate comparison runs
// =====================================================

use crate::db::helpers::{i64_to_usize, usize_to_i64};
use crate::db_types::{ComparisonReport, ComparisonStats, TableDiffEntry};
use crate::error::{DbSyncError, Result};
use serde::{Deserialize, Serialize};
use sqlx::{Pool, Row, Sqlite};

pub const DEFAULT_HISTORY_LIMIT: i64 = 10;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonHistoryRecord {
    pub id: i64,
    pub db1_name: String,
    pub db2_name: String,
    pub db1_display_name: String,
    pub db2_display_name: String,
    pub stats: ComparisonStats,
    pub entries: Vec<TableDiffEntry>,
    pub created_at: String,
}

#[derive(Clone)]
pub struct HistoryStore {
    pool: Pool<Sqlite>,
}

impl HistoryStore {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    pub async fn append_comparison(&self, report: &ComparisonReport) -> Result<i64> {
        let stats = report.stats();
        let payload = serde_json::to_string(&report.entries)?;

        let id = sqlx::query(
            r#"
            INSERT INTO comparison_history
                (db1_name, db2_name, db1_display_name, db2_display_name, total_tables,
                 different_tables, same_tables, missing_tables, comparison_data, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&report.db1_name)
        .bind(&report.db2_name)
        .bind(&report.db1_display_name)
        .bind(&report.db2_display_name)
        .bind(usize_to_i64(stats.total_tables))
        .bind(usize_to_i64(stats.different_tables))
        .bind(usize_to_i64(stats.same_tables))
        .bind(usize_to_i64(stats.missing_tables))
        .bind(payload)
        .bind(report.generated_at.format("%Y-%m-%d %H:%M:%S%.f").to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| DbSyncError::storage("Failed to save comparison history", e))?
        .last_insert_rowid();

        Ok(id)
    }

    /// Newest first.
    pub async fn get_comparison_history(&self, limit: i64) -> Result<Vec<ComparisonHistoryRecord>> {
        let limit = if limit <= 0 { DEFAULT_HISTORY_LIMIT } else { limit };
        let rows = sqlx::query(
            r#"
            SELECT id, db1_name, db2_name, db1_display_name, db2_display_name,
                   total_tables, different_tables, same_tables, missing_tables,
                   comparison_data, CAST(created_at AS TEXT) AS created_at
            FROM comparison_history
            ORDER BY created_at DESC, id DESC
            LIMIT ?
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DbSyncError::storage("Failed to fetch comparison history", e))?;

        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            let db1_name: String = row.try_get("db1_name").unwrap_or_default();
            let db2_name: String = row.try_get("db2_name").unwrap_or_default();
            let payload: String = row.try_get("comparison_data").unwrap_or_default();
            let entries = match serde_json::from_str::<Vec<TableDiffEntry>>(&payload) {
                Ok(entries) => entries,
                Err(e) => {
                    log::warn!("Skipping unreadable history payload: {}", e);
                    Vec::new()
                }
            };

            records.push(ComparisonHistoryRecord {
                id: row.try_get("id").unwrap_or_default(),
                db1_display_name: row
                    .try_get::<Option<String>, _>("db1_display_name")
                    .ok()
                    .flatten()
                    .unwrap_or_else(|| db1_name.clone()),
                db2_display_name: row
                    .try_get::<Option<String>, _>("db2_display_name")
                    .ok()
                    .flatten()
                    .unwrap_or_else(|| db2_name.clone()),
                db1_name,
                db2_name,
                stats: ComparisonStats {
                    total_tables: i64_to_usize(row.try_get::<i64, _>("total_tables").unwrap_or(0)),
                    different_tables: i64_to_usize(row.try_get::<i64, _>("different_tables").unwrap_or(0)),
                    same_tables: i64_to_usize(row.try_get::<i64, _>("same_tables").unwrap_or(0)),
                    missing_tables: i64_to_usize(row.try_get::<i64, _>("missing_tables").unwrap_or(0)),
                },
                entries,
                created_at: row.try_get("created_at").unwrap_or_default(),
            });
        }
        Ok(records)
    }
}

#[cfg(test)]
mod tests;
