// =====================================================
// PROJECTS
// =====================================================

use crate::error::{DbSyncError, Result};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{Pool, Row, Sqlite};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub created_at: String,
}

#[derive(Clone)]
pub struct ProjectStore {
    pool: Pool<Sqlite>,
}

impl ProjectStore {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    pub async fn create_project(&self, name: &str, description: Option<&str>) -> Result<Project> {
        let name = name.trim();
        if name.is_empty() {
            return Err(DbSyncError::InvalidInput("Project name cannot be empty".to_string()));
        }
        let now = chrono::Utc::now().format("%Y-%m-%d %H:%M:%S%.f").to_string();

        let id = sqlx::query(
            "INSERT INTO projects (name, description, created_at, updated_at) VALUES (?, ?, ?, ?)",
        )
        .bind(name)
        .bind(description)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                DbSyncError::InvalidInput(format!("A project named '{}' already exists", name))
            }
            other => DbSyncError::storage("Failed to create project", other),
        })?
        .last_insert_rowid();

        log::info!("Created project {} ({})", id, name);
        Ok(Project {
            id,
            name: name.to_string(),
            description: description.map(str::to_string),
            created_at: now,
        })
    }

    pub async fn list_projects(&self) -> Result<Vec<Project>> {
        let rows = sqlx::query(
            "SELECT id, name, description, CAST(created_at AS TEXT) AS created_at FROM projects ORDER BY name ASC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DbSyncError::storage("Failed to list projects", e))?;

        Ok(rows.iter().map(row_to_project).collect())
    }

    pub async fn get_project(&self, id: i64) -> Result<Option<Project>> {
        let row = sqlx::query(
            "SELECT id, name, description, CAST(created_at AS TEXT) AS created_at FROM projects WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DbSyncError::storage("Failed to read project", e))?;

        Ok(row.as_ref().map(row_to_project))
    }

    /// Removes the project with its saved connections and filters.
    pub async fn delete_project(&self, id: i64) -> Result<bool> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DbSyncError::storage("Failed to begin transaction", e))?;

        for statement in [
            "DELETE FROM db_configs WHERE project_id = ?",
            "DELETE FROM table_filters WHERE project_id = ?",
        ] {
            sqlx::query(statement)
                .bind(id)
                .execute(&mut *tx)
                .await
                .map_err(|e| DbSyncError::storage("Failed to delete project data", e))?;
        }

        let deleted = sqlx::query("DELETE FROM projects WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(|e| DbSyncError::storage("Failed to delete project", e))?
            .rows_affected();

        tx.commit()
            .await
            .map_err(|e| DbSyncError::storage("Failed to commit project delete", e))?;

        Ok(deleted > 0)
    }
}

fn row_to_project(row: &SqliteRow) -> Project {
    Project {
        id: row.try_get("id").unwrap_or_default(),
        name: row.try_get("name").unwrap_or_default(),
        description: row.try_get::<Option<String>, _>("description").ok().flatten(),
        created_at: row
            .try_get::<Option<String>, _>("created_at")
            .ok()
            .flatten()
            .unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests;
