// Table- and record-level comparison between two MySQL databases,
// with a local SQLite store for connections, history and cached reports.

pub mod config;
pub mod db;
pub mod db_types;
pub mod error;
pub mod mysql;
pub mod sqlite;
pub mod store;

pub use config::EngineSettings;
pub use db_types::*;
pub use error::{DbSyncError, Result};
pub use mysql::{test_connection, MySqlConnector};
pub use store::LocalStore;
