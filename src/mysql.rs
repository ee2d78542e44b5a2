// =====================================================
// MySQL ENDPOINT
// sqlx-backed implementation of the SQL endpoint contract
// =====================================================

use crate::config::EngineSettings;
use crate::db::endpoint::{EndpointConnector, SqlEndpoint, UpsertOutcome};
use crate::db::helpers::parse_count_value;
use crate::db::sql_utils::{
    build_count_query, build_exists_statement, build_insert_ignore_statement,
    build_upsert_statement, qualified_table_name, quote_identifier_mysql,
    record_columns_and_values,
};
use crate::db::type_classifier::{format_naive_date, format_naive_datetime, ColumnTypeInfo};
use crate::db_types::{ColumnSchema, ConnectionConfig, DataRow};
use crate::error::{DbSyncError, Result};
use async_trait::async_trait;
use serde_json::Value;
use sqlx::mysql::{MySqlArguments, MySqlConnectOptions, MySqlPoolOptions, MySqlRow};
use sqlx::query::Query;
use sqlx::{Column, ConnectOptions, MySql, Pool, Row, TypeInfo, ValueRef};
use std::future::Future;
use std::time::Duration;

// --- Connection ---

fn build_connect_options(config: &ConnectionConfig) -> MySqlConnectOptions {
    let mut options = MySqlConnectOptions::new()
        .host(&config.host)
        .port(config.port)
        .username(&config.user)
        .database(&config.database);

    if !config.password.is_empty() {
        options = options.password(&config.password);
    }

    options.log_statements(log::LevelFilter::Debug)
}

pub(crate) fn describe_connect_error(config: &ConnectionConfig, message: &str, timeout_secs: u64) -> String {
    if message.contains("os error 111") || message.contains("Connection refused") {
        return format!(
            "Connection Refused ({})\n\nCheck if MySQL is running on {}:{}",
            message, config.host, config.port
        );
    }
    if message.contains("timed out") {
        return format!(
            "Connection Timed Out\n\nThe server at {}:{} did not respond within {} seconds.",
            config.host, config.port, timeout_secs
        );
    }
    if message.contains("Access denied") {
        return format!("Access denied for user '{}' on {}:{}", config.user, config.host, config.port);
    }
    message.to_string()
}

pub async fn create_pool(config: &ConnectionConfig, settings: &EngineSettings) -> Result<Pool<MySql>> {
    config.validate().map_err(DbSyncError::InvalidInput)?;

    MySqlPoolOptions::new()
        .max_connections(settings.max_pool_connections.max(1))
        .min_connections(1)
        .acquire_timeout(settings.acquire_timeout())
        .idle_timeout(Duration::from_secs(300))
        .connect_with(build_connect_options(config))
        .await
        .map_err(|e| {
            DbSyncError::Connectivity(describe_connect_error(
                config,
                &e.to_string(),
                settings.acquire_timeout_secs,
            ))
        })
}

/// Opens a single connection, runs `SELECT 1` and closes it again.
pub async fn test_connection(config: &ConnectionConfig) -> Result<String> {
    config.validate().map_err(DbSyncError::InvalidInput)?;

    let mut conn = build_connect_options(config)
        .connect()
        .await
        .map_err(|e| DbSyncError::Connectivity(describe_connect_error(config, &e.to_string(), 10)))?;

    sqlx::query("SELECT 1")
        .fetch_one(&mut conn)
        .await
        .map_err(|e| DbSyncError::Connectivity(format!("Query failed: {}", e)))?;

    let _ = sqlx::Connection::close(conn).await;
    Ok(format!(
        "Connected to {} on {}:{}",
        config.database, config.host, config.port
    ))
}

// --- Value binding / decoding ---

fn bind_json_value<'q>(
    query: Query<'q, MySql, MySqlArguments>,
    value: &Value,
) -> Query<'q, MySql, MySqlArguments> {
    match value {
        Value::Null => query.bind(None::<String>),
        Value::Bool(flag) => query.bind(*flag),
        Value::Number(number) => {
            if let Some(signed) = number.as_i64() {
                query.bind(signed)
            } else if let Some(unsigned) = number.as_u64() {
                query.bind(unsigned)
            } else {
                query.bind(number.as_f64().unwrap_or_default())
            }
        }
        Value::String(text) => query.bind(text.clone()),
        other => query.bind(other.to_string()),
    }
}

/// Key value for the existence lookup.
///
/// Big-integer keys travel as decimal strings; MySQL compares a BIGINT
/// column against a string parameter as DOUBLE, so they are bound as
/// integers instead.
pub(crate) fn key_lookup_value(key: &ColumnTypeInfo, value: Option<&Value>) -> Value {
    let Some(value) = value else {
        return Value::Null;
    };
    if !key.is_big_integer {
        return value.clone();
    }
    match value {
        Value::String(text) => {
            let trimmed = text.trim();
            if let Ok(signed) = trimmed.parse::<i64>() {
                Value::from(signed)
            } else if let Ok(unsigned) = trimmed.parse::<u64>() {
                Value::from(unsigned)
            } else {
                value.clone()
            }
        }
        other => other.clone(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DecodeKind {
    Bool,
    Signed,
    Unsigned,
    BigInteger,
    BigUnsigned,
    Float,
    Decimal,
    DateTime,
    Date,
    Time,
    Json,
    Binary,
    Text,
}

/// Maps a MySQL column type name to the way its values are decoded.
pub(crate) fn decode_kind(type_name: &str) -> DecodeKind {
    let upper = type_name.trim().to_ascii_uppercase();
    match upper.as_str() {
        "BOOLEAN" | "BOOL" => DecodeKind::Bool,
        "BIGINT" => DecodeKind::BigInteger,
        "BIGINT UNSIGNED" => DecodeKind::BigUnsigned,
        "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "INTEGER" => DecodeKind::Signed,
        "TINYINT UNSIGNED" | "SMALLINT UNSIGNED" | "MEDIUMINT UNSIGNED" | "INT UNSIGNED"
        | "YEAR" => DecodeKind::Unsigned,
        "FLOAT" | "DOUBLE" | "REAL" => DecodeKind::Float,
        "DECIMAL" | "NUMERIC" => DecodeKind::Decimal,
        "DATETIME" | "TIMESTAMP" => DecodeKind::DateTime,
        "DATE" => DecodeKind::Date,
        "TIME" => DecodeKind::Time,
        "JSON" => DecodeKind::Json,
        "BLOB" | "TINYBLOB" | "MEDIUMBLOB" | "LONGBLOB" | "BINARY" | "VARBINARY" | "BIT"
        | "GEOMETRY" => DecodeKind::Binary,
        _ => DecodeKind::Text,
    }
}

fn decode_text_fallback(row: &MySqlRow, idx: usize) -> Value {
    row.try_get_unchecked::<String, _>(idx)
        .map(Value::String)
        .or_else(|_| {
            row.try_get_unchecked::<Vec<u8>, _>(idx)
                .map(|bytes| Value::String(String::from_utf8_lossy(&bytes).to_string()))
        })
        .unwrap_or(Value::Null)
}

fn decode_mysql_value(row: &MySqlRow, idx: usize) -> Value {
    let Ok(raw) = row.try_get_raw(idx) else {
        return Value::Null;
    };
    if raw.is_null() {
        return Value::Null;
    }
    let kind = decode_kind(raw.type_info().name());

    let decoded = match kind {
        DecodeKind::Bool => row.try_get::<bool, _>(idx).ok().map(Value::Bool),
        DecodeKind::Signed => row
            .try_get::<i64, _>(idx)
            .or_else(|_| row.try_get_unchecked::<i64, _>(idx))
            .ok()
            .map(Value::from),
        DecodeKind::Unsigned => row
            .try_get::<u64, _>(idx)
            .or_else(|_| row.try_get_unchecked::<u64, _>(idx))
            .ok()
            .map(Value::from),
        DecodeKind::BigInteger => row
            .try_get_unchecked::<i64, _>(idx)
            .ok()
            .map(|v| Value::String(v.to_string())),
        DecodeKind::BigUnsigned => row
            .try_get_unchecked::<u64, _>(idx)
            .ok()
            .map(|v| Value::String(v.to_string())),
        DecodeKind::Float => row.try_get::<f64, _>(idx).ok().map(Value::from),
        DecodeKind::DateTime => row
            .try_get::<chrono::NaiveDateTime, _>(idx)
            .ok()
            .map(|v| Value::String(format_naive_datetime(&v))),
        DecodeKind::Date => row
            .try_get::<chrono::NaiveDate, _>(idx)
            .ok()
            .map(|v| Value::String(format_naive_date(&v))),
        DecodeKind::Time => row
            .try_get::<chrono::NaiveTime, _>(idx)
            .ok()
            .map(|v| Value::String(v.format("%H:%M:%S").to_string())),
        DecodeKind::Json => row.try_get::<Value, _>(idx).ok(),
        DecodeKind::Binary => row
            .try_get_unchecked::<Vec<u8>, _>(idx)
            .ok()
            .map(|bytes| Value::String(String::from_utf8_lossy(&bytes).to_string())),
        DecodeKind::Decimal | DecodeKind::Text => None,
    };

    decoded.unwrap_or_else(|| decode_text_fallback(row, idx))
}

fn row_to_data_row(row: &MySqlRow) -> DataRow {
    row.columns()
        .iter()
        .enumerate()
        .map(|(idx, column)| (column.name().to_string(), decode_mysql_value(row, idx)))
        .collect()
}

fn read_text_column(row: &MySqlRow, name: &str) -> Option<String> {
    match row.try_get::<Option<String>, _>(name) {
        Ok(value) => value,
        Err(_) => row
            .try_get::<Option<Vec<u8>>, _>(name)
            .ok()
            .flatten()
            .map(|bytes| String::from_utf8_lossy(&bytes).to_string()),
    }
}

// --- Endpoint ---

pub struct MySqlEndpoint {
    pool: Pool<MySql>,
    database: String,
    query_timeout: Duration,
}

impl MySqlEndpoint {
    pub fn new(pool: Pool<MySql>, database: &str, query_timeout: Duration) -> Self {
        Self {
            pool,
            database: database.to_string(),
            query_timeout,
        }
    }

    async fn with_timeout<T, F>(&self, future: F) -> Result<T>
    where
        F: Future<Output = std::result::Result<T, sqlx::Error>>,
    {
        tokio::time::timeout(self.query_timeout, future)
            .await
            .map_err(|_| {
                DbSyncError::Query(format!(
                    "Query timed out after {} seconds",
                    self.query_timeout.as_secs()
                ))
            })?
            .map_err(DbSyncError::from)
    }

    async fn execute(&self, sql: &str, params: &[Value]) -> Result<u64> {
        let mut query = sqlx::query(sql);
        for param in params {
            query = bind_json_value(query, param);
        }
        let done = self.with_timeout(query.execute(&self.pool)).await?;
        Ok(done.rows_affected())
    }
}

#[async_trait]
impl SqlEndpoint for MySqlEndpoint {
    fn database(&self) -> &str {
        &self.database
    }

    async fn list_tables(&self) -> Result<Vec<String>> {
        let sql = format!("SHOW TABLES FROM {}", quote_identifier_mysql(&self.database));
        let rows = self.with_timeout(sqlx::query(&sql).fetch_all(&self.pool)).await?;

        Ok(rows
            .iter()
            .map(|row| {
                row.try_get::<String, _>(0).unwrap_or_else(|_| {
                    row.try_get::<Vec<u8>, _>(0)
                        .map(|bytes| String::from_utf8_lossy(&bytes).to_string())
                        .unwrap_or_default()
                })
            })
            .filter(|name| !name.is_empty())
            .collect())
    }

    async fn count_rows(&self, table: &str) -> Result<u64> {
        let rows = self.query(&build_count_query(table), &[]).await?;
        rows.first()
            .and_then(|row| row.get("row_count"))
            .and_then(parse_count_value)
            .ok_or_else(|| DbSyncError::Query(format!("Failed to read row count for {}", table)))
    }

    async fn describe_columns(&self, table: &str) -> Result<Vec<ColumnSchema>> {
        let sql = format!(
            "SHOW COLUMNS FROM {}",
            qualified_table_name(&self.database, table)
        );
        let rows = self.with_timeout(sqlx::query(&sql).fetch_all(&self.pool)).await?;

        let mut columns = Vec::with_capacity(rows.len());
        for row in rows {
            let column_type = read_text_column(&row, "Type").unwrap_or_default();
            let data_type = column_type
                .split('(')
                .next()
                .unwrap_or(&column_type)
                .trim()
                .to_string();

            columns.push(ColumnSchema {
                name: read_text_column(&row, "Field").unwrap_or_default(),
                data_type,
                column_type,
                is_nullable: read_text_column(&row, "Null").as_deref() == Some("YES"),
                column_key: read_text_column(&row, "Key").unwrap_or_default(),
                column_default: read_text_column(&row, "Default"),
                extra: read_text_column(&row, "Extra").unwrap_or_default(),
            });
        }
        Ok(columns)
    }

    async fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<DataRow>> {
        let mut query = sqlx::query(sql);
        for param in params {
            query = bind_json_value(query, param);
        }
        let rows = self.with_timeout(query.fetch_all(&self.pool)).await?;
        Ok(rows.iter().map(row_to_data_row).collect())
    }

    async fn upsert(
        &self,
        table: &str,
        record: &DataRow,
        primary_key: &[ColumnTypeInfo],
    ) -> Result<UpsertOutcome> {
        let (columns, values) = record_columns_and_values(record);
        if columns.is_empty() {
            return Err(DbSyncError::SchemaMismatch(format!(
                "No columns to write for table '{}'",
                table
            )));
        }

        if primary_key.is_empty() {
            let sql = build_insert_ignore_statement(table, &columns);
            let affected = self.execute(&sql, &values).await?;
            return Ok(if affected == 0 {
                UpsertOutcome::Skipped
            } else {
                UpsertOutcome::Inserted
            });
        }

        let key_names: Vec<String> = primary_key.iter().map(|key| key.name.clone()).collect();
        let key_values: Vec<Value> = primary_key
            .iter()
            .map(|key| key_lookup_value(key, record.get(&key.name)))
            .collect();
        let existed = if key_values.iter().any(Value::is_null) {
            false
        } else {
            let lookup = build_exists_statement(table, &key_names);
            !self.query(&lookup, &key_values).await?.is_empty()
        };

        let sql = build_upsert_statement(table, &columns, &key_names);
        self.execute(&sql, &values).await?;

        Ok(if existed {
            UpsertOutcome::Updated
        } else {
            UpsertOutcome::Inserted
        })
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}

// --- Connector ---

#[derive(Debug, Clone, Default)]
pub struct MySqlConnector {
    settings: EngineSettings,
}

impl MySqlConnector {
    pub fn new(settings: EngineSettings) -> Self {
        Self { settings }
    }
}

#[async_trait]
impl EndpointConnector for MySqlConnector {
    async fn connect(&self, config: &ConnectionConfig) -> Result<Box<dyn SqlEndpoint>> {
        let pool = create_pool(config, &self.settings).await?;
        log::debug!(
            "Opened MySQL session {}@{}:{}/{}",
            config.user,
            config.host,
            config.port,
            config.database
        );
        Ok(Box::new(MySqlEndpoint::new(
            pool,
            &config.database,
            self.settings.query_timeout(),
        )))
    }
}
