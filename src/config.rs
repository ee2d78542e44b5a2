// =====================================================
// ENGINE SETTINGS
// =====================================================

use crate::db_types::DEFAULT_RECORD_LIMIT;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

pub const ENGINE_SETTINGS_KEY: &str = "engine_settings";
pub const APP_DIR_NAME: &str = "dbsync";
pub const LOCAL_DB_FILE_NAME: &str = "databasesync.db";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineSettings {
    pub default_record_limit: usize,
    pub query_timeout_secs: u64,
    pub max_pool_connections: u32,
    pub acquire_timeout_secs: u64,
    pub history_limit: i64,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            default_record_limit: DEFAULT_RECORD_LIMIT,
            query_timeout_secs: 30,
            max_pool_connections: 2,
            acquire_timeout_secs: 10,
            history_limit: 10,
        }
    }
}

impl EngineSettings {
    pub fn query_timeout(&self) -> Duration {
        Duration::from_secs(self.query_timeout_secs.max(1))
    }

    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_secs.max(1))
    }
}

/// `<data dir>/dbsync/databasesync.db`, or `None` when the platform has no data dir.
pub fn default_local_db_path() -> Option<PathBuf> {
    dirs::data_dir().map(|dir| dir.join(APP_DIR_NAME).join(LOCAL_DB_FILE_NAME))
}
