//! Data Access Layer for the bookmark store
//!
//! Persists the local bookmark cache and the pending order queue behind a
//! small asynchronous key-value contract. Two backends are provided: an
//! in-memory map (tests, ephemeral sessions) and SQLite.

pub mod schema;
pub mod memory;
pub mod sqlite;
pub mod repository;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use repository::*;

use async_trait::async_trait;
use bookmark_sync_core::StorageError;
use serde::{de::DeserializeOwned, Serialize};
use tracing::warn;

/// Key holding the flat bookmark list
pub const BOOKMARKS_KEY: &str = "bookmarks";

/// Key holding the pending folder-order queue
pub const PENDING_ORDERS_KEY: &str = "pendingOrders";

pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// Durable asynchronous key-value store
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> StorageResult<Option<serde_json::Value>>;
    async fn set(&self, key: &str, value: serde_json::Value) -> StorageResult<()>;
    async fn remove(&self, key: &str) -> StorageResult<()>;
}

/// Read and decode a value.
///
/// A missing or undecodable value is `Ok(None)`; a failed read is an error,
/// so callers never mistake an unreadable key for an empty one.
pub async fn read_json<T: DeserializeOwned>(store: &dyn KeyValueStore, key: &str) -> StorageResult<Option<T>> {
    let Some(value) = store.get(key).await? else {
        return Ok(None);
    };

    match serde_json::from_value(value) {
        Ok(decoded) => Ok(Some(decoded)),
        Err(e) => {
            warn!("Discarding undecodable '{}' entry: {}", key, e);
            Ok(None)
        }
    }
}

/// Encode and write a value
pub async fn write_json<T: Serialize + ?Sized>(store: &dyn KeyValueStore, key: &str, value: &T) -> StorageResult<()> {
    let encoded = serde_json::to_value(value)?;
    store.set(key, encoded).await
}
