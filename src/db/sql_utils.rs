// =====================================================
// SQL UTILITIES MODULE
// Identifier quoting and statement builders for MySQL
// =====================================================

use super::type_classifier::{coerce_value, ColumnTypeMap};
use crate::db_types::{DataRow, TableFilter};
use crate::error::{DbSyncError, Result};
use serde_json::Value;

pub fn quote_identifier_mysql(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

pub fn qualified_table_name(database: &str, table: &str) -> String {
    format!(
        "{}.{}",
        quote_identifier_mysql(database),
        quote_identifier_mysql(table)
    )
}

pub fn build_count_query(table: &str) -> String {
    format!(
        "SELECT COUNT(*) AS row_count FROM {}",
        quote_identifier_mysql(table)
    )
}

/// Column list and bound values for a record, in record order.
pub fn record_columns_and_values(record: &DataRow) -> (Vec<String>, Vec<Value>) {
    let mut columns = Vec::with_capacity(record.len());
    let mut values = Vec::with_capacity(record.len());
    for (column, value) in record {
        columns.push(column.clone());
        values.push(value.clone());
    }
    (columns, values)
}

fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}

fn quoted_list(columns: &[String]) -> String {
    columns
        .iter()
        .map(|c| quote_identifier_mysql(c))
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn build_upsert_statement(table: &str, columns: &[String], key_columns: &[String]) -> String {
    let mut updates = columns
        .iter()
        .filter(|c| !key_columns.contains(c))
        .map(|c| {
            let quoted = quote_identifier_mysql(c);
            format!("{} = VALUES({})", quoted, quoted)
        })
        .collect::<Vec<_>>();

    // Key-only rows still need an assignment for ON DUPLICATE KEY to parse.
    if updates.is_empty() {
        if let Some(first) = key_columns.first() {
            let quoted = quote_identifier_mysql(first);
            updates.push(format!("{} = {}", quoted, quoted));
        }
    }

    format!(
        "INSERT INTO {} ({}) VALUES ({}) ON DUPLICATE KEY UPDATE {}",
        quote_identifier_mysql(table),
        quoted_list(columns),
        placeholders(columns.len()),
        updates.join(", ")
    )
}

pub fn build_insert_ignore_statement(table: &str, columns: &[String]) -> String {
    format!(
        "INSERT IGNORE INTO {} ({}) VALUES ({})",
        quote_identifier_mysql(table),
        quoted_list(columns),
        placeholders(columns.len())
    )
}

pub fn build_exists_statement(table: &str, key_columns: &[String]) -> String {
    let predicates = key_columns
        .iter()
        .map(|c| format!("{} = ?", quote_identifier_mysql(c)))
        .collect::<Vec<_>>()
        .join(" AND ");
    format!(
        "SELECT 1 AS found FROM {} WHERE {} LIMIT 1",
        quote_identifier_mysql(table),
        predicates
    )
}

fn normalize_operator(operator: &str) -> String {
    operator
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_ascii_uppercase()
}

fn normalize_logic(logic: Option<&str>) -> Result<&'static str> {
    match logic.map(|l| l.trim().to_ascii_uppercase()) {
        None => Ok("AND"),
        Some(l) if l.is_empty() || l == "AND" => Ok("AND"),
        Some(l) if l == "OR" => Ok("OR"),
        Some(other) => Err(DbSyncError::InvalidInput(format!(
            "Unsupported filter logic '{}'",
            other
        ))),
    }
}

fn list_values(value: &Value) -> Vec<Value> {
    match value {
        Value::Array(items) => items.clone(),
        Value::String(text) => text
            .split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(|item| Value::String(item.to_string()))
            .collect(),
        Value::Null => Vec::new(),
        other => vec![other.clone()],
    }
}

/// Compiles UI filters into a parameterised `SELECT * ... WHERE ... LIMIT n`.
///
/// Field names are checked against `types`; values go through the same
/// coercion the transfer path applies.
pub fn build_filtered_select(
    table: &str,
    filters: &[TableFilter],
    types: &ColumnTypeMap,
    record_limit: usize,
) -> Result<(String, Vec<Value>)> {
    let mut clause = String::new();
    let mut params = Vec::new();

    for (idx, filter) in filters.iter().enumerate() {
        let field = filter.field.trim();
        let info = types.get(field).ok_or_else(|| {
            DbSyncError::InvalidInput(format!(
                "Filter field '{}' does not exist in table '{}'",
                field, table
            ))
        })?;
        let quoted = quote_identifier_mysql(field);
        let operator = normalize_operator(&filter.operator);

        let predicate = match operator.as_str() {
            "=" | "!=" | "<>" | ">" | ">=" | "<" | "<=" | "LIKE" | "NOT LIKE" => {
                params.push(coerce_value(Some(info), filter.value.clone()));
                format!("{} {} ?", quoted, operator)
            }
            "IN" | "NOT IN" => {
                let values = list_values(&filter.value);
                if values.is_empty() {
                    return Err(DbSyncError::InvalidInput(format!(
                        "Filter on '{}' with {} needs at least one value",
                        field, operator
                    )));
                }
                let count = values.len();
                params.extend(values.into_iter().map(|v| coerce_value(Some(info), v)));
                format!("{} {} ({})", quoted, operator, placeholders(count))
            }
            "IS NULL" | "IS NOT NULL" => format!("{} {}", quoted, operator),
            other => {
                return Err(DbSyncError::InvalidInput(format!(
                    "Unsupported filter operator '{}'",
                    other
                )))
            }
        };

        if idx > 0 {
            let logic = normalize_logic(filter.logic.as_deref())?;
            clause.push(' ');
            clause.push_str(logic);
            clause.push(' ');
        }
        clause.push_str(&predicate);
    }

    let mut sql = format!("SELECT * FROM {}", quote_identifier_mysql(table));
    if !clause.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&clause);
    }
    sql.push_str(&format!(" LIMIT {}", record_limit.max(1)));

    Ok((sql, params))
}
