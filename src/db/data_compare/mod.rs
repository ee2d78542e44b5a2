// =====================================================
// DATA COMPARE MODULE
// Record-level reconciliation between two fetched record
// sets, plus the filtered dual-side fetch that feeds it
// =====================================================

use crate::db::endpoint::{close_pair, open_pair, EndpointConnector, SqlEndpoint};
use crate::db::helpers::value_to_key_token;
use crate::db::sql_utils::build_filtered_select;
use crate::db::type_classifier::{
    build_type_map, classify_columns, coerce_row, merge_type_maps, ColumnTypeInfo,
};
use crate::db_types::{
    notify_progress, CompareStage, ConnectionConfig, DataRow, FilterSettings, ProgressEvent,
    ProgressSender, QueryResult, TableFilter,
};
use crate::error::{DbSyncError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use tokio_util::sync::CancellationToken;

// =====================================================
// TYPES AND STRUCTS
// =====================================================

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum RecordStatus {
    Match,
    Different,
    OnlyLeft,
    OnlyRight,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RecordReconciliationResult {
    pub join_key_value: String,
    pub status: RecordStatus,
    pub left_record: Option<DataRow>,
    pub right_record: Option<DataRow>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ReconciliationTotals {
    pub total_left: usize,
    pub total_right: usize,
    pub total_match: usize,
    /// `Different + OnlyLeft + OnlyRight`.
    pub total_diff: usize,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReconciliationOutcome {
    pub results: Vec<RecordReconciliationResult>,
    pub totals: ReconciliationTotals,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RecordComparison {
    pub table_name: String,
    pub join_key: String,
    pub fields: Vec<ColumnTypeInfo>,
    pub outcome: ReconciliationOutcome,
}

#[derive(Debug, Clone, Default)]
pub struct RecordCompareRequest {
    pub table: String,
    pub join_key: String,
    pub filters: Vec<TableFilter>,
    pub settings: FilterSettings,
    pub progress: Option<ProgressSender>,
    pub cancel: Option<CancellationToken>,
}

// =====================================================
// RECONCILIATION
// =====================================================

/// Index of join-key token to record, keeping first-seen key order.
///
/// Records with a null or absent key are left out. A repeated key keeps
/// its first position and the last record seen.
pub struct KeyIndex<'a> {
    order: Vec<String>,
    records: HashMap<String, &'a DataRow>,
}

impl<'a> KeyIndex<'a> {
    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn get(&self, token: &str) -> Option<&'a DataRow> {
        self.records.get(token).copied()
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.order.iter()
    }
}

pub fn build_key_index<'a>(rows: &'a [DataRow], join_key: &str) -> KeyIndex<'a> {
    let mut order = Vec::new();
    let mut records = HashMap::with_capacity(rows.len());

    for row in rows {
        let Some(token) = row.get(join_key).and_then(value_to_key_token) else {
            continue;
        };
        if records.insert(token.clone(), row).is_none() {
            order.push(token);
        }
    }

    KeyIndex { order, records }
}

/// Structural equality where object key order does not matter.
pub fn deep_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Object(left), Value::Object(right)) => records_equal(left, right),
        (Value::Array(left), Value::Array(right)) => {
            left.len() == right.len() && left.iter().zip(right).all(|(l, r)| deep_equal(l, r))
        }
        _ => a == b,
    }
}

pub fn records_equal(left: &DataRow, right: &DataRow) -> bool {
    if left.len() != right.len() {
        return false;
    }
    let mut left_keys: Vec<&String> = left.keys().collect();
    let mut right_keys: Vec<&String> = right.keys().collect();
    left_keys.sort();
    right_keys.sort();
    if left_keys != right_keys {
        return false;
    }
    left_keys
        .into_iter()
        .all(|key| matches!((left.get(key), right.get(key)), (Some(l), Some(r)) if deep_equal(l, r)))
}

pub fn reconcile(left: &[DataRow], right: &[DataRow], join_key: &str) -> ReconciliationOutcome {
    let left_index = build_key_index(left, join_key);
    let right_index = build_key_index(right, join_key);

    let mut results = Vec::with_capacity(left_index.len().max(right_index.len()));
    let mut totals = ReconciliationTotals {
        total_left: left.len(),
        total_right: right.len(),
        ..ReconciliationTotals::default()
    };

    for token in left_index.keys() {
        let left_record = left_index.get(token);
        let right_record = right_index.get(token);
        let status = match (left_record, right_record) {
            (Some(l), Some(r)) if records_equal(l, r) => RecordStatus::Match,
            (Some(_), Some(_)) => RecordStatus::Different,
            _ => RecordStatus::OnlyLeft,
        };
        results.push(RecordReconciliationResult {
            join_key_value: token.clone(),
            status,
            left_record: left_record.cloned(),
            right_record: right_record.cloned(),
        });
    }

    for token in right_index.keys() {
        if left_index.get(token).is_some() {
            continue;
        }
        results.push(RecordReconciliationResult {
            join_key_value: token.clone(),
            status: RecordStatus::OnlyRight,
            left_record: None,
            right_record: right_index.get(token).cloned(),
        });
    }

    for result in &results {
        if result.status == RecordStatus::Match {
            totals.total_match += 1;
        } else {
            totals.total_diff += 1;
        }
    }

    ReconciliationOutcome { results, totals }
}

// =====================================================
// FETCHING
// =====================================================

/// Column list with classifier flags for one table.
pub async fn get_table_fields(
    connector: &dyn EndpointConnector,
    config: &ConnectionConfig,
    table: &str,
) -> Result<Vec<ColumnTypeInfo>> {
    let endpoint = connector.connect(config).await?;
    let described = endpoint.describe_columns(table).await;
    endpoint.close().await;
    Ok(classify_columns(&described?))
}

/// Returns the classified columns and the uncoerced rows.
async fn fetch_side(
    endpoint: &dyn SqlEndpoint,
    table: &str,
    filters: &[TableFilter],
    settings: &FilterSettings,
) -> Result<(Vec<ColumnTypeInfo>, Vec<DataRow>)> {
    let fields = classify_columns(&endpoint.describe_columns(table).await?);
    if fields.is_empty() {
        return Err(DbSyncError::SchemaMismatch(format!(
            "Table '{}' does not exist in {}",
            table,
            endpoint.database()
        )));
    }
    let types = build_type_map(&fields);
    let (sql, params) = build_filtered_select(table, filters, &types, settings.record_limit)?;

    let rows = endpoint.query(&sql, &params).await?;
    Ok((fields, rows))
}

/// Runs the filtered select for `table` on an open endpoint.
pub async fn fetch_filtered_records(
    endpoint: &dyn SqlEndpoint,
    table: &str,
    filters: &[TableFilter],
    settings: &FilterSettings,
) -> Result<QueryResult> {
    let (fields, rows) = fetch_side(endpoint, table, filters, settings).await?;
    let types = build_type_map(&fields);
    Ok(QueryResult {
        columns: fields.into_iter().map(|field| field.name).collect(),
        rows: rows.into_iter().map(|row| coerce_row(row, &types)).collect(),
    })
}

/// Filtered fetch against a single connection.
pub async fn search_records(
    connector: &dyn EndpointConnector,
    config: &ConnectionConfig,
    table: &str,
    filters: &[TableFilter],
    settings: &FilterSettings,
) -> Result<QueryResult> {
    let endpoint = connector.connect(config).await?;
    let fetched = fetch_filtered_records(endpoint.as_ref(), table, filters, settings).await;
    endpoint.close().await;
    fetched
}

/// Fetches `table` from both sides with the same filters and reconciles them.
pub async fn compare_table_records(
    connector: &dyn EndpointConnector,
    conn1: &ConnectionConfig,
    conn2: &ConnectionConfig,
    request: &RecordCompareRequest,
) -> Result<RecordComparison> {
    if request.join_key.trim().is_empty() {
        return Err(DbSyncError::InvalidInput("A join key is required".to_string()));
    }
    if request.settings.record_limit == 0 {
        return Err(DbSyncError::InvalidInput(
            "Record limit must be greater than 0".to_string(),
        ));
    }

    let (left, right) = open_pair(connector, conn1, conn2).await?;
    let fetched = fetch_both_sides(left.as_ref(), right.as_ref(), request).await;
    close_pair(left, right).await;
    let (fields, left_rows, right_rows) = fetched?;

    let outcome = reconcile(&left_rows, &right_rows, &request.join_key);
    log::info!(
        "Record compare on {}: {} left, {} right, {} matching, {} differing",
        request.table,
        outcome.totals.total_left,
        outcome.totals.total_right,
        outcome.totals.total_match,
        outcome.totals.total_diff
    );

    Ok(RecordComparison {
        table_name: request.table.clone(),
        join_key: request.join_key.clone(),
        fields,
        outcome,
    })
}

async fn fetch_both_sides(
    left: &dyn SqlEndpoint,
    right: &dyn SqlEndpoint,
    request: &RecordCompareRequest,
) -> Result<(Vec<ColumnTypeInfo>, Vec<DataRow>, Vec<DataRow>)> {
    let is_cancelled = || request.cancel.as_ref().is_some_and(CancellationToken::is_cancelled);
    let progress = request.progress.as_ref();
    let mut sides = Vec::with_capacity(2);

    for (idx, endpoint) in [left, right].into_iter().enumerate() {
        if is_cancelled() {
            return Err(DbSyncError::Cancelled);
        }
        let (fields, rows) =
            fetch_side(endpoint, &request.table, &request.filters, &request.settings).await?;
        if !fields.iter().any(|field| field.name == request.join_key) {
            return Err(DbSyncError::InvalidInput(format!(
                "Join key '{}' is not a column of {}.{}",
                request.join_key,
                endpoint.database(),
                request.table
            )));
        }
        notify_progress(
            progress,
            ProgressEvent {
                current: idx + 1,
                total: 2,
                current_label: endpoint.database().to_string(),
                stage: CompareStage::FetchingRecords,
            },
        );
        sides.push((fields, rows));
    }

    if is_cancelled() {
        return Err(DbSyncError::Cancelled);
    }

    let (right_fields, right_rows) = sides.pop().unwrap_or_default();
    let (left_fields, left_rows) = sides.pop().unwrap_or_default();

    // INT on one side and BIGINT on the other must still compare equal
    let types = merge_type_maps(&left_fields, &right_fields);
    let fields = left_fields
        .into_iter()
        .map(|field| types.get(&field.name).cloned().unwrap_or(field))
        .collect();
    let coerce_all = |rows: Vec<DataRow>| -> Vec<DataRow> {
        rows.into_iter().map(|row| coerce_row(row, &types)).collect()
    };
    Ok((fields, coerce_all(left_rows), coerce_all(right_rows)))
}
