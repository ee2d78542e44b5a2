// =====================================================
// SQL ENDPOINT CONTRACT
// What the engines need from a relational source, and how
// they obtain connection configs and sessions
// =====================================================

use crate::db::type_classifier::{classify_column, ColumnTypeInfo};
use crate::db_types::{ColumnSchema, ConnectionConfig, ConnectionSlot, DataRow, ProjectContext};
use crate::error::{DbSyncError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum UpsertOutcome {
    Inserted,
    Updated,
    Skipped,
}

/// One open session against one database.
#[async_trait]
pub trait SqlEndpoint: Send + Sync {
    fn database(&self) -> &str;

    async fn list_tables(&self) -> Result<Vec<String>>;

    async fn count_rows(&self, table: &str) -> Result<u64>;

    async fn describe_columns(&self, table: &str) -> Result<Vec<ColumnSchema>>;

    async fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<DataRow>>;

    /// Insert-or-update keyed by `primary_key`; insert-or-ignore when empty.
    async fn upsert(
        &self,
        table: &str,
        record: &DataRow,
        primary_key: &[ColumnTypeInfo],
    ) -> Result<UpsertOutcome>;

    async fn close(&self);
}

#[async_trait]
pub trait EndpointConnector: Send + Sync {
    async fn connect(&self, config: &ConnectionConfig) -> Result<Box<dyn SqlEndpoint>>;
}

/// Source of the two connection configs for a project.
#[async_trait]
pub trait ConnectionSource: Send + Sync {
    async fn get_connection_config(
        &self,
        ctx: &ProjectContext,
        slot: ConnectionSlot,
    ) -> Result<Option<ConnectionConfig>>;
}

pub async fn resolve_config_pair(
    source: &dyn ConnectionSource,
    ctx: &ProjectContext,
) -> Result<(ConnectionConfig, ConnectionConfig)> {
    let left = source.get_connection_config(ctx, ConnectionSlot::Left).await?;
    let right = source.get_connection_config(ctx, ConnectionSlot::Right).await?;

    match (left, right) {
        (Some(left), Some(right)) => Ok((left, right)),
        (None, None) => Err(DbSyncError::ConfigurationMissing(
            "no connection configured for either side".to_string(),
        )),
        (None, _) => Err(DbSyncError::ConfigurationMissing(
            "no connection configured for the left side".to_string(),
        )),
        (_, None) => Err(DbSyncError::ConfigurationMissing(
            "no connection configured for the right side".to_string(),
        )),
    }
}

/// Opens both sessions. If the second fails the first is closed before returning.
pub async fn open_pair(
    connector: &dyn EndpointConnector,
    left: &ConnectionConfig,
    right: &ConnectionConfig,
) -> Result<(Box<dyn SqlEndpoint>, Box<dyn SqlEndpoint>)> {
    let left_endpoint = connector.connect(left).await?;
    match connector.connect(right).await {
        Ok(right_endpoint) => Ok((left_endpoint, right_endpoint)),
        Err(e) => {
            left_endpoint.close().await;
            Err(e)
        }
    }
}

pub async fn close_pair(left: Box<dyn SqlEndpoint>, right: Box<dyn SqlEndpoint>) {
    left.close().await;
    right.close().await;
}

/// Primary key columns in declaration order, classified.
pub fn primary_key_columns(columns: &[ColumnSchema]) -> Vec<ColumnTypeInfo> {
    columns
        .iter()
        .filter(|column| column.is_primary_key())
        .map(classify_column)
        .collect()
}

#[cfg(test)]
pub(crate) mod testing;
