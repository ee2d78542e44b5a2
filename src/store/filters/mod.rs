// =====================================================
// SAVED TABLE FILTERS
// Per (project, database, table) filter sets
// =====================================================

use crate::db_types::{
    FilterSettings, ProjectContext, TableFilter, TableFilterSet, FILTER_FORMAT_VERSION,
};
use crate::error::{DbSyncError, Result};
use serde::{Deserialize, Serialize};
use sqlx::{Pool, Row, Sqlite};

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
struct FilterEnvelope {
    filters: Vec<TableFilter>,
    #[serde(default)]
    settings: FilterSettings,
    #[serde(default)]
    version: String,
    #[serde(default)]
    saved_at: Option<String>,
}

pub fn encode_filter_payload(filters: &[TableFilter], settings: &FilterSettings) -> Result<String> {
    let envelope = FilterEnvelope {
        filters: filters.to_vec(),
        settings: *settings,
        version: FILTER_FORMAT_VERSION.to_string(),
        saved_at: Some(chrono::Utc::now().to_rfc3339()),
    };
    Ok(serde_json::to_string(&envelope)?)
}

/// Accepts the versioned envelope and the older bare filter array.
pub fn decode_filter_payload(raw: &str) -> Result<(Vec<TableFilter>, FilterSettings)> {
    let value: serde_json::Value = serde_json::from_str(raw)?;
    if value.is_array() {
        let filters: Vec<TableFilter> = serde_json::from_value(value)?;
        return Ok((filters, FilterSettings::default()));
    }
    let envelope: FilterEnvelope = serde_json::from_value(value)?;
    Ok((envelope.filters, envelope.settings))
}

#[derive(Clone)]
pub struct FilterStore {
    pool: Pool<Sqlite>,
}

impl FilterStore {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    pub async fn save_table_filters(
        &self,
        ctx: ProjectContext,
        database: &str,
        table: &str,
        filters: &[TableFilter],
        settings: &FilterSettings,
    ) -> Result<()> {
        if settings.record_limit == 0 {
            return Err(DbSyncError::InvalidInput(
                "Record limit must be greater than 0".to_string(),
            ));
        }
        let payload = encode_filter_payload(filters, settings)?;

        sqlx::query(
            r#"
            INSERT INTO table_filters (project_id, database_name, table_name, filter_data, updated_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(project_id, database_name, table_name)
            DO UPDATE SET filter_data = excluded.filter_data, updated_at = excluded.updated_at
            "#,
        )
        .bind(ctx.project_id)
        .bind(database)
        .bind(table)
        .bind(payload)
        .bind(chrono::Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|e| DbSyncError::storage("Failed to save table filters", e))?;

        log::debug!(
            "Saved {} filter(s) for {}.{} in project {}",
            filters.len(),
            database,
            table,
            ctx.project_id
        );
        Ok(())
    }

    pub async fn get_table_filters(
        &self,
        ctx: ProjectContext,
        database: &str,
        table: &str,
    ) -> Result<Option<TableFilterSet>> {
        let row = sqlx::query(
            r#"
            SELECT filter_data FROM table_filters
            WHERE project_id = ? AND database_name = ? AND table_name = ?
            "#,
        )
        .bind(ctx.project_id)
        .bind(database)
        .bind(table)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DbSyncError::storage("Failed to read table filters", e))?;

        let Some(row) = row else {
            return Ok(None);
        };
        let raw: String = row.try_get("filter_data").unwrap_or_default();
        let (filters, settings) = decode_filter_payload(&raw)?;

        Ok(Some(TableFilterSet {
            project_id: ctx.project_id,
            table_name: table.to_string(),
            database: database.to_string(),
            filters,
            settings,
        }))
    }

    pub async fn delete_table_filters(
        &self,
        ctx: ProjectContext,
        database: &str,
        table: &str,
    ) -> Result<bool> {
        let result = sqlx::query(
            "DELETE FROM table_filters WHERE project_id = ? AND database_name = ? AND table_name = ?",
        )
        .bind(ctx.project_id)
        .bind(database)
        .bind(table)
        .execute(&self.pool)
        .await
        .map_err(|e| DbSyncError::storage("Failed to delete table filters", e))?;
        Ok(result.rows_affected() > 0)
    }
}
