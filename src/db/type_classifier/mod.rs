// =====================================================
// TYPE CLASSIFIER
// Column classification and the value coercion shared by
// the filter/search path and the transfer path
// =====================================================

use crate::db::helpers::number_to_decimal_string;
use crate::db_types::ColumnSchema;
use chrono::{DateTime, Local, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

pub const CANONICAL_DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ColumnTypeInfo {
    pub name: String,
    pub sql_type: String,
    pub is_big_integer: bool,
    pub is_temporal: bool,
}

pub type ColumnTypeMap = HashMap<String, ColumnTypeInfo>;

pub fn classify_column(column: &ColumnSchema) -> ColumnTypeInfo {
    let sql_type = if column.column_type.trim().is_empty() {
        column.data_type.clone()
    } else {
        column.column_type.clone()
    };
    ColumnTypeInfo {
        name: column.name.clone(),
        is_big_integer: is_big_integer_type(&sql_type),
        is_temporal: is_temporal_type(&sql_type),
        sql_type,
    }
}

pub fn classify_columns(columns: &[ColumnSchema]) -> Vec<ColumnTypeInfo> {
    columns.iter().map(classify_column).collect()
}

pub fn build_type_map(columns: &[ColumnTypeInfo]) -> ColumnTypeMap {
    columns
        .iter()
        .map(|info| (info.name.clone(), info.clone()))
        .collect()
}

/// Type map for comparing two sides of one table.
///
/// A column that is big-integer or temporal on either side carries that
/// flag, so both sides coerce to the same representation.
pub fn merge_type_maps(left: &[ColumnTypeInfo], right: &[ColumnTypeInfo]) -> ColumnTypeMap {
    let mut merged = build_type_map(left);
    for info in right {
        merged
            .entry(info.name.clone())
            .and_modify(|existing| {
                existing.is_big_integer |= info.is_big_integer;
                existing.is_temporal |= info.is_temporal;
            })
            .or_insert_with(|| info.clone());
    }
    merged
}

/// 64-bit integers exceed the 2^53 safe range of double-backed numbers.
pub fn is_big_integer_type(sql_type: &str) -> bool {
    let normalized = base_type_name(sql_type);
    matches!(normalized.as_str(), "bigint" | "serial" | "int8")
}

pub fn is_temporal_type(sql_type: &str) -> bool {
    let normalized = base_type_name(sql_type);
    matches!(normalized.as_str(), "date" | "datetime" | "timestamp")
}

fn base_type_name(sql_type: &str) -> String {
    let lowered = sql_type.trim().to_ascii_lowercase();
    lowered
        .split(|c: char| c == '(' || c.is_whitespace())
        .next()
        .unwrap_or_default()
        .to_string()
}

/// Applies the classifier's coercions to a single value.
///
/// Big-integer values become exact decimal strings. Temporal values given
/// as ISO-8601 strings (with or without a `Z`/offset suffix) become
/// `YYYY-MM-DD HH:MM:SS`; offset-qualified instants are rendered in local
/// time. Everything else passes through untouched.
pub fn coerce_value(info: Option<&ColumnTypeInfo>, value: Value) -> Value {
    let Some(info) = info else {
        return value;
    };
    if value.is_null() {
        return value;
    }

    if info.is_big_integer {
        return match value {
            Value::Number(number) => Value::String(number_to_decimal_string(&number)),
            other => other,
        };
    }

    if info.is_temporal {
        if let Value::String(text) = &value {
            if let Some(canonical) = canonicalize_temporal(text) {
                return Value::String(canonical);
            }
        }
    }

    value
}

pub fn coerce_row(
    row: serde_json::Map<String, Value>,
    types: &ColumnTypeMap,
) -> serde_json::Map<String, Value> {
    row.into_iter()
        .map(|(key, value)| {
            let coerced = coerce_value(types.get(&key), value);
            (key, coerced)
        })
        .collect()
}

/// Returns `None` when the text is not an ISO date-time that needs rewriting.
pub fn canonicalize_temporal(text: &str) -> Option<String> {
    let trimmed = text.trim();

    if let Ok(instant) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(
            instant
                .with_timezone(&Local)
                .format(CANONICAL_DATETIME_FORMAT)
                .to_string(),
        );
    }

    if trimmed.contains('T') {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S%.f") {
            return Some(naive.format(CANONICAL_DATETIME_FORMAT).to_string());
        }
    }

    None
}

pub fn format_naive_datetime(value: &NaiveDateTime) -> String {
    value.format(CANONICAL_DATETIME_FORMAT).to_string()
}

pub fn format_naive_date(value: &NaiveDate) -> String {
    value.format("%Y-%m-%d").to_string()
}

#[cfg(test)]
mod tests;
