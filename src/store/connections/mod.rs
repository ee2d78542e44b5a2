// =====================================================
// CONNECTION STORE
// One saved config per (project, slot)
// =====================================================

use crate::db::endpoint::ConnectionSource;
use crate::db_types::{ConnectionConfig, ConnectionSlot, ProjectContext};
use crate::error::{DbSyncError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{Pool, Row, Sqlite};

/// Saved connection without its password.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionSummary {
    pub id: i64,
    pub slot: String,
    pub connection_name: String,
    pub host: String,
    pub port: u16,
    pub user: String,
    pub database: String,
    pub updated_at: String,
}

#[derive(Clone)]
pub struct ConnectionStore {
    pool: Pool<Sqlite>,
}

impl ConnectionStore {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    pub async fn save_connection_config(
        &self,
        ctx: ProjectContext,
        slot: ConnectionSlot,
        config: &ConnectionConfig,
    ) -> Result<()> {
        config.validate().map_err(DbSyncError::InvalidInput)?;

        let connection_name = config
            .display_name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or(slot.default_display_name());
        let now = chrono::Utc::now().format("%Y-%m-%d %H:%M:%S%.f").to_string();

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DbSyncError::storage("Failed to begin transaction", e))?;

        sqlx::query("DELETE FROM db_configs WHERE project_id = ? AND config_name = ?")
            .bind(ctx.project_id)
            .bind(slot.as_str())
            .execute(&mut *tx)
            .await
            .map_err(|e| DbSyncError::storage("Failed to replace connection config", e))?;

        sqlx::query(
            r#"
            INSERT INTO db_configs
                (project_id, config_name, connection_name, host, port, user, password,
                 database_name, is_active, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, 1, ?, ?)
            "#,
        )
        .bind(ctx.project_id)
        .bind(slot.as_str())
        .bind(connection_name)
        .bind(&config.host)
        .bind(i64::from(config.port))
        .bind(&config.user)
        .bind(&config.password)
        .bind(&config.database)
        .bind(&now)
        .bind(&now)
        .execute(&mut *tx)
        .await
        .map_err(|e| DbSyncError::storage("Failed to save connection config", e))?;

        tx.commit()
            .await
            .map_err(|e| DbSyncError::storage("Failed to commit connection config", e))?;

        log::info!(
            "Saved {} connection for project {} ({}@{}:{}/{})",
            slot.as_str(),
            ctx.project_id,
            config.user,
            config.host,
            config.port,
            config.database
        );
        Ok(())
    }

    pub async fn get_connection_config(
        &self,
        ctx: ProjectContext,
        slot: ConnectionSlot,
    ) -> Result<Option<ConnectionConfig>> {
        let row = sqlx::query(
            r#"
            SELECT connection_name, host, port, user, password, database_name
            FROM db_configs
            WHERE project_id = ? AND config_name = ? AND is_active = 1
            ORDER BY updated_at DESC, id DESC
            LIMIT 1
            "#,
        )
        .bind(ctx.project_id)
        .bind(slot.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DbSyncError::storage("Failed to read connection config", e))?;

        Ok(row.map(|row| row_to_config(&row, slot)))
    }

    pub async fn list_connection_configs(&self, ctx: ProjectContext) -> Result<Vec<ConnectionSummary>> {
        let rows = sqlx::query(
            r#"
            SELECT id, config_name, connection_name, host, port, user, database_name,
                   CAST(updated_at AS TEXT) AS updated_at
            FROM db_configs
            WHERE project_id = ? AND is_active = 1
            ORDER BY updated_at DESC, id DESC
            "#,
        )
        .bind(ctx.project_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DbSyncError::storage("Failed to list connection configs", e))?;

        Ok(rows
            .iter()
            .map(|row| ConnectionSummary {
                id: row.try_get("id").unwrap_or_default(),
                slot: row.try_get("config_name").unwrap_or_default(),
                connection_name: row
                    .try_get::<Option<String>, _>("connection_name")
                    .ok()
                    .flatten()
                    .unwrap_or_default(),
                host: row.try_get("host").unwrap_or_default(),
                port: port_from_row(row),
                user: row.try_get("user").unwrap_or_default(),
                database: row.try_get("database_name").unwrap_or_default(),
                updated_at: row
                    .try_get::<Option<String>, _>("updated_at")
                    .ok()
                    .flatten()
                    .unwrap_or_default(),
            })
            .collect())
    }
}

fn port_from_row(row: &SqliteRow) -> u16 {
    row.try_get::<i64, _>("port")
        .ok()
        .and_then(|p| u16::try_from(p).ok())
        .unwrap_or(3306)
}

fn row_to_config(row: &SqliteRow, slot: ConnectionSlot) -> ConnectionConfig {
    let display_name = row
        .try_get::<Option<String>, _>("connection_name")
        .ok()
        .flatten()
        .filter(|name| !name.trim().is_empty())
        .unwrap_or_else(|| slot.default_display_name().to_string());

    ConnectionConfig {
        display_name: Some(display_name),
        host: row.try_get("host").unwrap_or_default(),
        port: port_from_row(row),
        user: row.try_get("user").unwrap_or_default(),
        password: row
            .try_get::<Option<String>, _>("password")
            .ok()
            .flatten()
            .unwrap_or_default(),
        database: row.try_get("database_name").unwrap_or_default(),
    }
}

#[async_trait]
impl ConnectionSource for ConnectionStore {
    async fn get_connection_config(
        &self,
        ctx: &ProjectContext,
        slot: ConnectionSlot,
    ) -> Result<Option<ConnectionConfig>> {
        ConnectionStore::get_connection_config(self, *ctx, slot).await
    }
}

#[cfg(test)]
mod tests;
