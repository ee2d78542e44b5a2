// =====================================================
// DATA TRANSFER MODULE
// Pushes reconciled records into one side with per-record
// isolation and type-preserving coercion
// =====================================================

use crate::db::data_compare::{RecordReconciliationResult, RecordStatus};
use crate::db::endpoint::{primary_key_columns, EndpointConnector, SqlEndpoint, UpsertOutcome};
use crate::db::helpers::truncate_chars;
use crate::db::type_classifier::{
    build_type_map, classify_columns, coerce_value, ColumnTypeInfo, ColumnTypeMap,
};
use crate::db_types::{
    notify_progress, CompareStage, ConnectionConfig, ConnectionSlot, DataRow, ProgressEvent,
    ProgressSender,
};
use crate::error::{DbSyncError, Result};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

const MAX_LOG_MESSAGE_CHARS: usize = 500;

#[derive(Debug, Clone, PartialEq)]
pub enum TransferItem {
    Reconciled(RecordReconciliationResult),
    /// A record already chosen by the caller.
    Resolved(DataRow),
}

#[derive(Debug, Clone)]
pub struct TransferRequest {
    pub target: ConnectionSlot,
    pub table: String,
    pub items: Vec<TransferItem>,
    pub progress: Option<ProgressSender>,
    pub cancel: Option<CancellationToken>,
}

impl TransferRequest {
    pub fn from_results(
        target: ConnectionSlot,
        table: &str,
        results: Vec<RecordReconciliationResult>,
    ) -> Self {
        Self {
            target,
            table: table.to_string(),
            items: results.into_iter().map(TransferItem::Reconciled).collect(),
            progress: None,
            cancel: None,
        }
    }

    pub fn from_rows(target: ConnectionSlot, table: &str, rows: Vec<DataRow>) -> Self {
        Self {
            target,
            table: table.to_string(),
            items: rows.into_iter().map(TransferItem::Resolved).collect(),
            progress: None,
            cancel: None,
        }
    }

    pub fn with_progress(mut self, progress: ProgressSender) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = Some(cancel);
        self
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TransferOutcome {
    Inserted,
    Updated,
    Skipped,
    Error,
}

impl From<UpsertOutcome> for TransferOutcome {
    fn from(outcome: UpsertOutcome) -> Self {
        match outcome {
            UpsertOutcome::Inserted => TransferOutcome::Inserted,
            UpsertOutcome::Updated => TransferOutcome::Updated,
            UpsertOutcome::Skipped => TransferOutcome::Skipped,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TransferLogEntry {
    pub index: usize,
    pub join_key_value: Option<String>,
    pub outcome: TransferOutcome,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skipped_fields: Vec<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TransferSummary {
    pub inserted_count: usize,
    pub updated_count: usize,
    pub skipped_count: usize,
    pub error_count: usize,
    pub per_record_log: Vec<TransferLogEntry>,
    pub cancelled: bool,
}

impl TransferSummary {
    fn record(&mut self, entry: TransferLogEntry) {
        match entry.outcome {
            TransferOutcome::Inserted => self.inserted_count += 1,
            TransferOutcome::Updated => self.updated_count += 1,
            TransferOutcome::Skipped => self.skipped_count += 1,
            TransferOutcome::Error => self.error_count += 1,
        }
        self.per_record_log.push(entry);
    }
}

/// The record to write into `target`, or `None` when nothing should be written.
///
/// A `Different` pair is resolved to the side opposite the target.
pub fn resolve_record(
    result: &RecordReconciliationResult,
    target: ConnectionSlot,
) -> Option<&DataRow> {
    match result.status {
        RecordStatus::Match => None,
        RecordStatus::OnlyLeft => result.left_record.as_ref(),
        RecordStatus::OnlyRight => result.right_record.as_ref(),
        RecordStatus::Different => match target.opposite() {
            ConnectionSlot::Left => result.left_record.as_ref(),
            ConnectionSlot::Right => result.right_record.as_ref(),
        },
    }
}

/// Keeps only target columns and applies the classifier coercions.
/// Returns the prepared record and the names of dropped fields.
pub fn prepare_record(record: &DataRow, target_types: &ColumnTypeMap) -> (DataRow, Vec<String>) {
    let mut prepared = DataRow::new();
    let mut skipped = Vec::new();
    for (field, value) in record {
        match target_types.get(field) {
            Some(info) => {
                prepared.insert(field.clone(), coerce_value(Some(info), value.clone()));
            }
            None => skipped.push(field.clone()),
        }
    }
    (prepared, skipped)
}

struct TargetTable {
    types: ColumnTypeMap,
    primary_key: Vec<ColumnTypeInfo>,
}

async fn load_target_table(endpoint: &dyn SqlEndpoint, table: &str) -> Result<TargetTable> {
    let columns = endpoint.describe_columns(table).await.map_err(|e| {
        DbSyncError::SchemaMismatch(format!(
            "Target table '{}' is not available in {}: {}",
            table,
            endpoint.database(),
            e
        ))
    })?;
    if columns.is_empty() {
        return Err(DbSyncError::SchemaMismatch(format!(
            "Target table '{}' has no columns in {}",
            table,
            endpoint.database()
        )));
    }
    Ok(TargetTable {
        types: build_type_map(&classify_columns(&columns)),
        primary_key: primary_key_columns(&columns),
    })
}

/// Opens the target session, writes every item and always closes it.
pub async fn transfer_records(
    connector: &dyn EndpointConnector,
    target_config: &ConnectionConfig,
    request: &TransferRequest,
) -> Result<TransferSummary> {
    if request.table.trim().is_empty() {
        return Err(DbSyncError::InvalidInput("A target table is required".to_string()));
    }

    let endpoint = connector.connect(target_config).await?;
    let outcome = transfer_into(endpoint.as_ref(), request).await;
    endpoint.close().await;
    outcome
}

pub async fn transfer_into(
    endpoint: &dyn SqlEndpoint,
    request: &TransferRequest,
) -> Result<TransferSummary> {
    let target = load_target_table(endpoint, &request.table).await?;
    let total = request.items.len();
    let mut summary = TransferSummary::default();

    log::info!(
        "Transferring {} record(s) into {}.{} ({} side)",
        total,
        endpoint.database(),
        request.table,
        request.target.as_str()
    );

    for (index, item) in request.items.iter().enumerate() {
        if request.cancel.as_ref().is_some_and(CancellationToken::is_cancelled) {
            log::info!("Transfer cancelled after {} of {} records", index, total);
            summary.cancelled = true;
            break;
        }

        let entry = transfer_one(endpoint, &target, request, index, item).await;
        summary.record(entry);

        notify_progress(
            request.progress.as_ref(),
            ProgressEvent {
                current: index + 1,
                total,
                current_label: request.table.clone(),
                stage: CompareStage::TransferringRecords,
            },
        );
    }

    log::info!(
        "Transfer into {} finished: {} inserted, {} updated, {} skipped, {} failed",
        request.table,
        summary.inserted_count,
        summary.updated_count,
        summary.skipped_count,
        summary.error_count
    );
    Ok(summary)
}

async fn transfer_one(
    endpoint: &dyn SqlEndpoint,
    target: &TargetTable,
    request: &TransferRequest,
    index: usize,
    item: &TransferItem,
) -> TransferLogEntry {
    let (join_key_value, record) = match item {
        TransferItem::Reconciled(result) => (
            Some(result.join_key_value.clone()),
            resolve_record(result, request.target),
        ),
        TransferItem::Resolved(row) => (None, Some(row)),
    };

    let mut entry = TransferLogEntry {
        index,
        join_key_value,
        outcome: TransferOutcome::Skipped,
        message: None,
        skipped_fields: Vec::new(),
    };

    let Some(record) = record else {
        entry.message = Some("Record is identical on both sides".to_string());
        return entry;
    };

    let (prepared, skipped_fields) = prepare_record(record, &target.types);
    if !skipped_fields.is_empty() {
        log::debug!(
            "Record {} for {}: skipping fields not on target: {}",
            index,
            request.table,
            skipped_fields.join(", ")
        );
    }
    entry.skipped_fields = skipped_fields;

    if prepared.is_empty() {
        entry.message = Some(format!(
            "No fields of this record exist on target table '{}'",
            request.table
        ));
        return entry;
    }

    match endpoint
        .upsert(&request.table, &prepared, &target.primary_key)
        .await
    {
        Ok(outcome) => {
            entry.outcome = outcome.into();
            if outcome == UpsertOutcome::Skipped {
                entry.message = Some("Duplicate row ignored".to_string());
            }
        }
        Err(e) => {
            log::warn!("Record {} for {} failed: {}", index, request.table, e);
            entry.outcome = TransferOutcome::Error;
            entry.message = Some(truncate_chars(&e.to_string(), MAX_LOG_MESSAGE_CHARS));
        }
    }
    entry
}
