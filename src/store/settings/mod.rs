// =====================================================
// APP SETTINGS
// JSON values keyed by name in app_settings
// =====================================================

use crate::config::{EngineSettings, ENGINE_SETTINGS_KEY};
use crate::error::{DbSyncError, Result};
use serde::{de::DeserializeOwned, Serialize};
use sqlx::{Pool, Row, Sqlite};

#[derive(Clone)]
pub struct SettingsStore {
    pool: Pool<Sqlite>,
}

impl SettingsStore {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    pub async fn set_setting<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let json = serde_json::to_string(value)?;
        sqlx::query(
            r#"
            INSERT INTO app_settings (key, value, updated_at)
            VALUES (?, ?, ?)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(json)
        .bind(chrono::Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|e| DbSyncError::storage("Failed to save setting", e))?;
        Ok(())
    }

    /// Returns `None` when the key is absent or holds unreadable JSON.
    pub async fn get_setting<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let row = sqlx::query("SELECT value FROM app_settings WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DbSyncError::storage("Failed to read setting", e))?;

        let Some(row) = row else {
            return Ok(None);
        };
        let raw: String = row.try_get("value").unwrap_or_default();
        match serde_json::from_str(&raw) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                log::warn!("Ignoring unreadable setting '{}': {}", key, e);
                Ok(None)
            }
        }
    }

    pub async fn get_engine_settings(&self) -> Result<EngineSettings> {
        Ok(self
            .get_setting::<EngineSettings>(ENGINE_SETTINGS_KEY)
            .await?
            .unwrap_or_default())
    }

    pub async fn save_engine_settings(&self, settings: &EngineSettings) -> Result<()> {
        self.set_setting(ENGINE_SETTINGS_KEY, settings).await
    }
}

#[cfg(test)]
mod tests;
