//! Deferred Order-Sync Queue
//!
//! Folder orders changed locally are queued durably and sent to the server
//! later. A flush sends entries oldest first, clears each one as soon as
//! the server accepts it, and stops at the first failure so the remaining
//! entries are retried on the next flush in their original sequence.

use api_client::BookmarkApi;
use bookmark_sync_core::*;
use data_access::{KeyValueStore, PendingOrderRepository};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// How a flush run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlushStatus {
    /// Every entry present when the run started was attempted and accepted
    Completed,
    /// A request or storage write failed and the run stopped early
    Stopped,
    /// Another flush held the queue; it will run once more when it finishes
    AlreadyRunning,
}

/// Summary of one flush run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlushReport {
    pub status: FlushStatus,
    /// Entries the server accepted in this run
    pub synced: usize,
    /// Entries still pending after the run
    pub remaining: usize,
    pub last_error: Option<String>,
}

impl FlushReport {
    fn already_running() -> Self {
        Self {
            status: FlushStatus::AlreadyRunning,
            synced: 0,
            remaining: 0,
            last_error: None,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.status == FlushStatus::Completed
    }
}

pub struct OrderSyncQueue {
    repository: PendingOrderRepository,
    api: Arc<dyn BookmarkApi>,
    flush_lock: Mutex<()>,
    /// Set when a flush was requested while another was running
    rerun: AtomicBool,
}

impl OrderSyncQueue {
    pub fn new(store: Arc<dyn KeyValueStore>, api: Arc<dyn BookmarkApi>) -> Self {
        Self {
            repository: PendingOrderRepository::new(store),
            api,
            flush_lock: Mutex::new(()),
            rerun: AtomicBool::new(false),
        }
    }

    /// Record the latest order for a folder, replacing any older entry
    pub async fn enqueue(&self, entry: FolderOrderPending) -> Result<()> {
        debug!(
            "Queued order for folder {} ({} bookmarks)",
            entry.folder_id,
            entry.bookmarks.len()
        );
        self.repository.upsert(entry).await?;
        Ok(())
    }

    /// Pending entries, oldest first
    pub async fn pending(&self) -> Result<Vec<FolderOrderPending>> {
        Ok(self.repository.pending_in_order().await?)
    }

    pub async fn pending_count(&self) -> Result<usize> {
        Ok(self.repository.len().await?)
    }

    /// Send every pending entry to the server.
    ///
    /// Runs are never interleaved. A call made while a run is in progress
    /// returns [`FlushStatus::AlreadyRunning`] immediately and makes the
    /// running flush go around once more, so entries queued in the meantime
    /// are picked up.
    pub async fn flush(&self) -> FlushReport {
        let Ok(mut guard) = self.flush_lock.try_lock() else {
            self.rerun.store(true, Ordering::SeqCst);
            debug!("Order flush already running, coalescing");
            return FlushReport::already_running();
        };

        let mut synced = 0;
        loop {
            self.rerun.store(false, Ordering::SeqCst);

            if let Err(error) = self.flush_once(&mut synced).await {
                return self.stopped(synced, error).await;
            }
            if self.rerun.load(Ordering::SeqCst) {
                continue;
            }

            drop(guard);
            // A request may have found the lock held after the check above
            if !self.rerun.load(Ordering::SeqCst) {
                break;
            }
            match self.flush_lock.try_lock() {
                Ok(next) => guard = next,
                // The current holder started after that request
                Err(_) => break,
            }
        }

        let remaining = match self.repository.len().await {
            Ok(remaining) => remaining,
            Err(error) => return self.stopped(synced, error.into()).await,
        };
        if synced > 0 {
            info!("Synced order for {} folders", synced);
        }
        FlushReport {
            status: FlushStatus::Completed,
            synced,
            remaining,
            last_error: None,
        }
    }

    async fn stopped(&self, synced: usize, error: BookmarkSyncError) -> FlushReport {
        let remaining = match self.repository.len().await {
            Ok(remaining) => remaining,
            Err(e) => {
                warn!("Failed to count pending folder orders: {}", e);
                0
            }
        };
        warn!(
            "Order sync stopped after {} folders, {} still pending: {}",
            synced, remaining, error
        );
        FlushReport {
            status: FlushStatus::Stopped,
            synced,
            remaining,
            last_error: Some(error.to_string()),
        }
    }

    async fn flush_once(&self, synced: &mut usize) -> Result<()> {
        for entry in self.repository.pending_in_order().await? {
            self.api.update_order(&entry.to_payload()).await?;
            *synced += 1;

            // A newer order queued while the request was in flight stays
            if !self.repository.remove_if_unchanged(&entry).await? {
                debug!("Order for folder {} changed during sync, keeping it", entry.folder_id);
            }
        }
        Ok(())
    }
}
