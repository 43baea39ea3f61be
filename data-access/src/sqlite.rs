//! SQLite-backed key-value store

use crate::{schema, KeyValueStore, StorageResult};
use async_trait::async_trait;
use bookmark_sync_core::StorageError;
use rusqlite::OptionalExtension;
use std::path::Path;
use std::sync::Arc;
use tokio_rusqlite::Connection;
use tracing::debug;

fn backend_error(context: &str, e: impl std::fmt::Display) -> StorageError {
    StorageError::Backend {
        details: format!("{}: {}", context, e),
    }
}

/// Durable store keeping one JSON document per key
#[derive(Clone)]
pub struct SqliteStore {
    connection: Arc<Connection>,
}

impl SqliteStore {
    /// Open (or create) the database at the specified path
    pub async fn open<P: AsRef<Path>>(db_path: P) -> StorageResult<Self> {
        let path = db_path.as_ref().to_path_buf();
        debug!("Opening key-value store at {}", path.display());

        let connection = Connection::open(path)
            .await
            .map_err(|e| backend_error("Failed to open database", e))?;

        let store = Self {
            connection: Arc::new(connection),
        };
        store.initialize_schema().await?;
        Ok(store)
    }

    /// Create an in-memory database (for testing)
    pub async fn in_memory() -> StorageResult<Self> {
        let connection = Connection::open_in_memory()
            .await
            .map_err(|e| backend_error("Failed to create in-memory database", e))?;

        let store = Self {
            connection: Arc::new(connection),
        };
        store.initialize_schema().await?;
        Ok(store)
    }

    async fn initialize_schema(&self) -> StorageResult<()> {
        self.connection
            .call(|conn| {
                conn.execute_batch(schema::SCHEMA_SQL)?;
                Ok(())
            })
            .await
            .map_err(|e| backend_error("Failed to initialize schema", e))
    }

    /// Keys currently stored, sorted
    pub async fn keys(&self) -> StorageResult<Vec<String>> {
        self.connection
            .call(|conn| {
                let mut stmt = conn.prepare("SELECT key FROM kv_store ORDER BY key")?;
                let keys = stmt
                    .query_map([], |row| row.get::<_, String>(0))?
                    .collect::<rusqlite::Result<Vec<String>>>()?;
                Ok(keys)
            })
            .await
            .map_err(|e| backend_error("Failed to list keys", e))
    }
}

#[async_trait]
impl KeyValueStore for SqliteStore {
    async fn get(&self, key: &str) -> StorageResult<Option<serde_json::Value>> {
        let key = key.to_string();
        let raw = self
            .connection
            .call(move |conn| {
                let raw = conn
                    .query_row("SELECT value FROM kv_store WHERE key = ?1", [key], |row| {
                        row.get::<_, String>(0)
                    })
                    .optional()?;
                Ok(raw)
            })
            .await
            .map_err(|e| backend_error("Failed to read key", e))?;

        match raw {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: serde_json::Value) -> StorageResult<()> {
        let key = key.to_string();
        let encoded = serde_json::to_string(&value)?;
        let now = chrono::Utc::now().timestamp();

        self.connection
            .call(move |conn| {
                conn.execute(
                    "INSERT OR REPLACE INTO kv_store (key, value, updated_at) VALUES (?1, ?2, ?3)",
                    rusqlite::params![key, encoded, now],
                )?;
                Ok(())
            })
            .await
            .map_err(|e| backend_error("Failed to write key", e))
    }

    async fn remove(&self, key: &str) -> StorageResult<()> {
        let key = key.to_string();
        self.connection
            .call(move |conn| {
                conn.execute("DELETE FROM kv_store WHERE key = ?1", [key])?;
                Ok(())
            })
            .await
            .map_err(|e| backend_error("Failed to remove key", e))
    }
}
