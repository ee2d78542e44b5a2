// =====================================================
// DATABASE MODULE
// Endpoint contract, shared SQL helpers and the three
// comparison/transfer engines
// =====================================================

pub mod data_compare;
pub mod data_transfer;
pub mod endpoint;
pub mod helpers;
pub mod sql_utils;
pub mod table_compare;
pub mod type_classifier;

pub use data_compare::{
    compare_table_records, get_table_fields, reconcile, search_records, RecordComparison,
    RecordCompareRequest, RecordReconciliationResult, RecordStatus, ReconciliationOutcome,
    ReconciliationTotals,
};
pub use data_transfer::{
    transfer_records, TransferItem, TransferLogEntry, TransferOutcome, TransferRequest,
    TransferSummary,
};
pub use endpoint::{ConnectionSource, EndpointConnector, SqlEndpoint, UpsertOutcome};
pub use table_compare::{compare_entries, sort_entries, CompareOptions, TableCompareEngine};
pub use type_classifier::{coerce_value, ColumnTypeInfo};
