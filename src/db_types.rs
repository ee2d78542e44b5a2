// =====================================================
// COMMON DATABASE TYPES AND STRUCTURES
// =====================================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// --- Record ---
pub type DataRow = serde_json::Map<String, serde_json::Value>;

// --- Connection Configuration ---
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionConfig {
    #[serde(rename = "connectionName", alias = "displayName", default)]
    pub display_name: Option<String>,
    pub host: String,
    pub port: u16,
    pub user: String,
    #[serde(default)]
    pub password: String,
    pub database: String,
}

impl ConnectionConfig {
    pub fn new(host: &str, port: u16, user: &str, password: &str, database: &str) -> Self {
        Self {
            display_name: None,
            host: host.to_string(),
            port,
            user: user.to_string(),
            password: password.to_string(),
            database: database.to_string(),
        }
    }

    pub fn with_display_name(mut self, name: &str) -> Self {
        self.display_name = Some(name.to_string());
        self
    }

    /// Name shown to the user; falls back to the database name.
    pub fn display_label(&self) -> String {
        match &self.display_name {
            Some(name) if !name.trim().is_empty() => name.clone(),
            _ => self.database.clone(),
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.host.trim().is_empty() {
            return Err("Host cannot be empty".to_string());
        }
        if self.user.trim().is_empty() {
            return Err("User cannot be empty".to_string());
        }
        if self.database.trim().is_empty() {
            return Err("Database cannot be empty".to_string());
        }
        if self.port == 0 {
            return Err("Port must be greater than 0".to_string());
        }
        Ok(())
    }
}

// --- Connection Slot ---
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionSlot {
    Left,
    Right,
}

impl ConnectionSlot {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionSlot::Left => "left",
            ConnectionSlot::Right => "right",
        }
    }

    pub fn opposite(&self) -> ConnectionSlot {
        match self {
            ConnectionSlot::Left => ConnectionSlot::Right,
            ConnectionSlot::Right => ConnectionSlot::Left,
        }
    }

    pub fn default_display_name(&self) -> &'static str {
        match self {
            ConnectionSlot::Left => "Database 1",
            ConnectionSlot::Right => "Database 2",
        }
    }
}

// --- Project Scope ---
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ProjectContext {
    pub project_id: i64,
}

impl ProjectContext {
    pub fn new(project_id: i64) -> Self {
        Self { project_id }
    }
}

// --- Column Schema ---
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct ColumnSchema {
    pub name: String,
    pub data_type: String,
    pub column_type: String,
    pub is_nullable: bool,
    pub column_key: String,
    pub column_default: Option<String>,
    pub extra: String,
}

impl ColumnSchema {
    pub fn is_primary_key(&self) -> bool {
        self.column_key.eq_ignore_ascii_case("PRI")
    }
}

// --- Query Result ---
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<DataRow>,
}

// --- Aggregate Diff ---
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TableDiffEntry {
    pub table_name: String,
    pub count1: u64,
    pub count2: u64,
    pub exists1: bool,
    pub exists2: bool,
    pub different: bool,
    pub difference: u64,
}

impl TableDiffEntry {
    /// Builds an entry with `different` and `difference` derived from the counts.
    pub fn new(table_name: &str, exists1: bool, count1: u64, exists2: bool, count2: u64) -> Self {
        Self {
            table_name: table_name.to_string(),
            count1,
            count2,
            exists1,
            exists2,
            different: count1 != count2 || exists1 != exists2,
            difference: count1.abs_diff(count2),
        }
    }

    pub fn is_missing(&self) -> bool {
        !self.exists1 || !self.exists2
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonReport {
    pub entries: Vec<TableDiffEntry>,
    pub db1_name: String,
    pub db2_name: String,
    pub db1_display_name: String,
    pub db2_display_name: String,
    pub total_tables: usize,
    pub from_cache: bool,
    pub generated_at: DateTime<Utc>,
}

impl ComparisonReport {
    pub fn stats(&self) -> ComparisonStats {
        ComparisonStats::from_entries(&self.entries)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonStats {
    pub total_tables: usize,
    pub different_tables: usize,
    pub same_tables: usize,
    pub missing_tables: usize,
}

impl ComparisonStats {
    pub fn from_entries(entries: &[TableDiffEntry]) -> Self {
        Self {
            total_tables: entries.len(),
            different_tables: entries.iter().filter(|e| e.different).count(),
            same_tables: entries
                .iter()
                .filter(|e| !e.different && e.exists1 && e.exists2)
                .count(),
            missing_tables: entries.iter().filter(|e| e.is_missing()).count(),
        }
    }
}

// --- Table Filters ---
pub const DEFAULT_RECORD_LIMIT: usize = 50_000;
pub const FILTER_FORMAT_VERSION: &str = "2.0";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TableFilter {
    pub field: String,
    pub operator: String,
    #[serde(default)]
    pub value: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logic: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FilterSettings {
    #[serde(default = "default_record_limit")]
    pub record_limit: usize,
}

fn default_record_limit() -> usize {
    DEFAULT_RECORD_LIMIT
}

impl Default for FilterSettings {
    fn default() -> Self {
        Self {
            record_limit: DEFAULT_RECORD_LIMIT,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TableFilterSet {
    pub project_id: i64,
    pub table_name: String,
    pub database: String,
    pub filters: Vec<TableFilter>,
    pub settings: FilterSettings,
}

// --- Progress ---
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CompareStage {
    ListingTables,
    CountingRows,
    FetchingRecords,
    TransferringRecords,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProgressEvent {
    pub current: usize,
    pub total: usize,
    pub current_label: String,
    pub stage: CompareStage,
}

pub type ProgressSender = tokio::sync::mpsc::UnboundedSender<ProgressEvent>;

/// Fire-and-forget; a dropped receiver is not an error.
pub fn notify_progress(sink: Option<&ProgressSender>, event: ProgressEvent) {
    if let Some(sender) = sink {
        let _ = sender.send(event);
    }
}

#[cfg(test)]
mod tests;
