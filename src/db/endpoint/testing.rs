// In-process endpoint used by the engine tests.

use super::*;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

#[derive(Default, Clone)]
pub struct FakeTable {
    pub columns: Vec<ColumnSchema>,
    pub rows: Vec<DataRow>,
}

#[derive(Default)]
pub struct FakeState {
    pub tables: HashMap<String, FakeTable>,
    pub fail_count_for: HashSet<String>,
    pub fail_upsert_for_key: Option<(String, Value)>,
    pub executed: Vec<(String, Vec<Value>)>,
    pub closed: usize,
}

#[derive(Clone)]
pub struct FakeEndpoint {
    pub database: String,
    pub state: Arc<Mutex<FakeState>>,
}

pub fn column(name: &str, column_type: &str, primary: bool) -> ColumnSchema {
    ColumnSchema {
        name: name.to_string(),
        data_type: column_type.split('(').next().unwrap_or_default().to_string(),
        column_type: column_type.to_string(),
        is_nullable: !primary,
        column_key: if primary { "PRI".to_string() } else { String::new() },
        column_default: None,
        extra: String::new(),
    }
}

pub fn row(pairs: &[(&str, Value)]) -> DataRow {
    pairs
        .iter()
        .map(|(key, value)| (key.to_string(), value.clone()))
        .collect()
}

impl FakeEndpoint {
    pub fn new(database: &str) -> Self {
        Self {
            database: database.to_string(),
            state: Arc::new(Mutex::new(FakeState::default())),
        }
    }

    pub fn with_table(self, name: &str, columns: Vec<ColumnSchema>, rows: Vec<DataRow>) -> Self {
        self.state
            .lock()
            .unwrap()
            .tables
            .insert(name.to_string(), FakeTable { columns, rows });
        self
    }

    pub fn with_row_count(self, name: &str, count: usize) -> Self {
        let rows = (0..count)
            .map(|i| row(&[("id", Value::from(i as i64))]))
            .collect();
        self.with_table(name, vec![column("id", "int(11)", true)], rows)
    }

    pub fn rows(&self, table: &str) -> Vec<DataRow> {
        self.state
            .lock()
            .unwrap()
            .tables
            .get(table)
            .map(|t| t.rows.clone())
            .unwrap_or_default()
    }

    pub fn closed(&self) -> usize {
        self.state.lock().unwrap().closed
    }

    pub fn executed(&self) -> Vec<(String, Vec<Value>)> {
        self.state.lock().unwrap().executed.clone()
    }
}

fn table_from_sql(sql: &str) -> Option<String> {
    let start = sql.find("FROM `")? + "FROM `".len();
    let rest = &sql[start..];
    let end = rest.find('`')?;
    Some(rest[..end].to_string())
}

#[async_trait]
impl SqlEndpoint for FakeEndpoint {
    fn database(&self) -> &str {
        &self.database
    }

    async fn list_tables(&self) -> Result<Vec<String>> {
        let state = self.state.lock().unwrap();
        let mut names = state.tables.keys().cloned().collect::<Vec<_>>();
        names.sort();
        Ok(names)
    }

    async fn count_rows(&self, table: &str) -> Result<u64> {
        let state = self.state.lock().unwrap();
        if state.fail_count_for.contains(table) {
            return Err(DbSyncError::Query(format!("count failed for {}", table)));
        }
        state
            .tables
            .get(table)
            .map(|t| t.rows.len() as u64)
            .ok_or_else(|| DbSyncError::Query(format!("Table '{}' doesn't exist", table)))
    }

    async fn describe_columns(&self, table: &str) -> Result<Vec<ColumnSchema>> {
        let state = self.state.lock().unwrap();
        state
            .tables
            .get(table)
            .map(|t| t.columns.clone())
            .ok_or_else(|| DbSyncError::Query(format!("Table '{}' doesn't exist", table)))
    }

    async fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<DataRow>> {
        let mut state = self.state.lock().unwrap();
        state.executed.push((sql.to_string(), params.to_vec()));
        let table = table_from_sql(sql)
            .ok_or_else(|| DbSyncError::Query(format!("unsupported query: {}", sql)))?;
        state
            .tables
            .get(&table)
            .map(|t| t.rows.clone())
            .ok_or_else(|| DbSyncError::Query(format!("Table '{}' doesn't exist", table)))
    }

    async fn upsert(
        &self,
        table: &str,
        record: &DataRow,
        primary_key: &[ColumnTypeInfo],
    ) -> Result<UpsertOutcome> {
        let mut state = self.state.lock().unwrap();
        if let Some((field, value)) = &state.fail_upsert_for_key {
            if record.get(field) == Some(value) {
                return Err(DbSyncError::Query("Duplicate entry".to_string()));
            }
        }
        let target = state
            .tables
            .get_mut(table)
            .ok_or_else(|| DbSyncError::Query(format!("Table '{}' doesn't exist", table)))?;

        if primary_key.is_empty() {
            if target.rows.iter().any(|existing| existing == record) {
                return Ok(UpsertOutcome::Skipped);
            }
            target.rows.push(record.clone());
            return Ok(UpsertOutcome::Inserted);
        }

        let position = target.rows.iter().position(|existing| {
            primary_key
                .iter()
                .all(|key| existing.get(&key.name) == record.get(&key.name))
        });
        match position {
            Some(idx) => {
                target.rows[idx] = record.clone();
                Ok(UpsertOutcome::Updated)
            }
            None => {
                target.rows.push(record.clone());
                Ok(UpsertOutcome::Inserted)
            }
        }
    }

    async fn close(&self) {
        self.state.lock().unwrap().closed += 1;
    }
}

#[derive(Default)]
pub struct FakeConnector {
    pub endpoints: HashMap<String, FakeEndpoint>,
}

impl FakeConnector {
    pub fn new(endpoints: Vec<FakeEndpoint>) -> Self {
        Self {
            endpoints: endpoints
                .into_iter()
                .map(|endpoint| (endpoint.database.clone(), endpoint))
                .collect(),
        }
    }
}

#[async_trait]
impl EndpointConnector for FakeConnector {
    async fn connect(&self, config: &ConnectionConfig) -> Result<Box<dyn SqlEndpoint>> {
        self.endpoints
            .get(&config.database)
            .map(|endpoint| Box::new(endpoint.clone()) as Box<dyn SqlEndpoint>)
            .ok_or_else(|| {
                DbSyncError::Connectivity(format!(
                    "Connection Refused: {}:{}",
                    config.host, config.port
                ))
            })
    }
}

pub fn config_for(database: &str) -> ConnectionConfig {
    ConnectionConfig::new("localhost", 3306, "root", "secret", database)
}
