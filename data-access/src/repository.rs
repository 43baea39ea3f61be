//! Typed repositories over the key-value store

use crate::{read_json, write_json, KeyValueStore, StorageResult, BOOKMARKS_KEY, PENDING_ORDERS_KEY};
use bookmark_sync_core::*;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

/// Persisted copy of the flat bookmark list
#[derive(Clone)]
pub struct BookmarkCache {
    store: Arc<dyn KeyValueStore>,
}

impl BookmarkCache {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Load the cached list. A missing or undecodable cache is empty; a
    /// failed read is an error.
    ///
    /// Every record read back is marked `is_local`, since the cache is the
    /// read path for the whole UI.
    pub async fn load(&self) -> StorageResult<Vec<BookmarkRecord>> {
        let mut records: Vec<BookmarkRecord> = read_json(self.store.as_ref(), BOOKMARKS_KEY)
            .await?
            .unwrap_or_default();
        for record in &mut records {
            record.is_local = true;
        }
        debug!("Loaded {} cached bookmarks", records.len());
        Ok(records)
    }

    pub async fn save(&self, records: &[BookmarkRecord]) -> StorageResult<()> {
        write_json(self.store.as_ref(), BOOKMARKS_KEY, records).await
    }

    pub async fn clear(&self) -> StorageResult<()> {
        self.store.remove(BOOKMARKS_KEY).await
    }
}

/// Durable map of folder key to pending folder order
pub struct PendingOrderRepository {
    store: Arc<dyn KeyValueStore>,
    /// Serializes this repository's own read-modify-write cycles
    write_lock: Mutex<()>,
}

impl PendingOrderRepository {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            write_lock: Mutex::new(()),
        }
    }

    /// Load the queue; an undecodable queue is treated as empty
    pub async fn load(&self) -> StorageResult<BTreeMap<FolderKey, FolderOrderPending>> {
        Ok(read_json(self.store.as_ref(), PENDING_ORDERS_KEY)
            .await?
            .unwrap_or_default())
    }

    /// Pending entries, oldest first
    pub async fn pending_in_order(&self) -> StorageResult<Vec<FolderOrderPending>> {
        let mut entries: Vec<FolderOrderPending> = self.load().await?.into_values().collect();
        entries.sort_by(|a, b| a.queued_at.cmp(&b.queued_at));
        Ok(entries)
    }

    pub async fn len(&self) -> StorageResult<usize> {
        Ok(self.load().await?.len())
    }

    pub async fn is_empty(&self) -> StorageResult<bool> {
        Ok(self.load().await?.is_empty())
    }

    /// Insert or replace the entry for its folder
    pub async fn upsert(&self, entry: FolderOrderPending) -> StorageResult<()> {
        let _guard = self.write_lock.lock().await;
        let mut pending = self.load().await?;
        pending.insert(entry.folder_id.clone(), entry);
        self.persist(&pending).await
    }

    /// Remove `entry` unless it was replaced by a newer one in the meantime.
    ///
    /// Returns whether an entry was removed.
    pub async fn remove_if_unchanged(&self, entry: &FolderOrderPending) -> StorageResult<bool> {
        let _guard = self.write_lock.lock().await;
        let mut pending = self.load().await?;
        match pending.get(&entry.folder_id) {
            Some(current) if current == entry => {
                pending.remove(&entry.folder_id);
                self.persist(&pending).await?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    pub async fn clear(&self) -> StorageResult<()> {
        let _guard = self.write_lock.lock().await;
        self.store.remove(PENDING_ORDERS_KEY).await
    }

    async fn persist(&self, pending: &BTreeMap<FolderKey, FolderOrderPending>) -> StorageResult<()> {
        if pending.is_empty() {
            self.store.remove(PENDING_ORDERS_KEY).await
        } else {
            write_json(self.store.as_ref(), PENDING_ORDERS_KEY, pending).await
        }
    }
}
