//! Bookmark state container.
//!
//! [`BookmarkStore`] owns the flat record list. Every change to the list
//! is made under its write lock and is persisted before it becomes
//! visible, so two operations never overwrite each other's result.

use crate::debounce::Debouncer;
use crate::events::{BookmarkEvent, ChangeSource, EventBus};
use crate::identity::IdentityResolver;
use crate::order_queue::{FlushReport, OrderSyncQueue};
use crate::reconcile::{reconcile, Reconciliation};
use crate::tree;
use api_client::{BookmarkApi, SessionProvider};
use bookmark_sync_core::*;
use data_access::{BookmarkCache, KeyValueStore};
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Default quiet period before queued folder orders are sent
pub const DEFAULT_SYNC_DEBOUNCE: Duration = Duration::from_millis(1500);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookmarkStoreConfig {
    /// Quiet period after the last reorder before the order queue flushes
    pub sync_debounce: Duration,
}

impl Default for BookmarkStoreConfig {
    fn default() -> Self {
        Self {
            sync_debounce: DEFAULT_SYNC_DEBOUNCE,
        }
    }
}

/// Result of a refresh
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RefreshOutcome {
    /// The server returned nothing to merge; local state was left alone
    Skipped,
    Reconciled {
        total: usize,
        local_survivors: usize,
        confirmed: usize,
    },
}

impl From<&Reconciliation> for RefreshOutcome {
    fn from(merge: &Reconciliation) -> Self {
        RefreshOutcome::Reconciled {
            total: merge.records.len(),
            local_survivors: merge.local_survivors,
            confirmed: merge.confirmed,
        }
    }
}

pub struct BookmarkStore {
    pub(crate) records: RwLock<Vec<BookmarkRecord>>,
    pub(crate) cache: BookmarkCache,
    pub(crate) api: Arc<dyn BookmarkApi>,
    pub(crate) session: Arc<dyn SessionProvider>,
    pub(crate) events: EventBus,
    pub(crate) order_queue: Arc<OrderSyncQueue>,
    pub(crate) sync_trigger: Debouncer,
    /// Whether memory holds what the cache holds. Until then nothing is
    /// written back, or a cache that failed to read would be overwritten.
    pub(crate) loaded: AtomicBool,
}

impl BookmarkStore {
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        api: Arc<dyn BookmarkApi>,
        session: Arc<dyn SessionProvider>,
        events: EventBus,
        config: BookmarkStoreConfig,
    ) -> Self {
        let order_queue = Arc::new(OrderSyncQueue::new(Arc::clone(&store), Arc::clone(&api)));

        let sync_trigger = {
            let queue = Arc::clone(&order_queue);
            let events = events.clone();
            Debouncer::new(config.sync_debounce, move || {
                let queue = Arc::clone(&queue);
                let events = events.clone();
                async move {
                    let report = queue.flush().await;
                    publish_flush(&events, &report);
                }
                .boxed()
            })
        };

        Self {
            records: RwLock::new(Vec::new()),
            cache: BookmarkCache::new(store),
            api,
            session,
            events,
            order_queue,
            sync_trigger,
            loaded: AtomicBool::new(false),
        }
    }

    /// Replace the in-memory list with the cached one. Returns the number
    /// of records loaded.
    ///
    /// On a failed read the in-memory list is left alone and the next write
    /// retries the load first.
    pub async fn load(&self) -> Result<usize> {
        let mut records = self.records.write().await;
        let cached = self.cache.load().await?;
        let count = cached.len();
        *records = cached;
        self.loaded.store(true, Ordering::SeqCst);
        drop(records);

        info!("Loaded {} bookmarks from cache", count);
        self.publish_changed(count, ChangeSource::CacheLoad);
        Ok(count)
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded.load(Ordering::SeqCst)
    }

    /// Make sure `records` (the locked list) reflects the cache before it
    /// is modified and written back
    pub(crate) async fn ensure_loaded(&self, records: &mut Vec<BookmarkRecord>) -> Result<()> {
        if self.loaded.load(Ordering::SeqCst) {
            return Ok(());
        }
        let cached = self.cache.load().await?;
        debug!("Loaded {} cached bookmarks before first write", cached.len());
        *records = cached;
        self.loaded.store(true, Ordering::SeqCst);
        Ok(())
    }

    /// Copy of the whole flat list
    pub async fn snapshot(&self) -> Vec<BookmarkRecord> {
        self.records.read().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    /// Children of `parent_id` (either id space), in display order
    pub async fn children_of(&self, parent_id: Option<&str>) -> Vec<BookmarkRecord> {
        let records = self.records.read().await;
        tree::children_of(&records, parent_id).into_iter().cloned().collect()
    }

    pub async fn roots(&self) -> Vec<BookmarkRecord> {
        self.children_of(None).await
    }

    /// Look a record up by its UI key or its server id
    pub async fn get(&self, id: &str) -> Option<BookmarkRecord> {
        let records = self.records.read().await;
        IdentityResolver::new(&records).find(id).cloned()
    }

    /// `None` when the reference is unknown
    pub async fn classify(&self, id: &str) -> Option<SyncState> {
        let records = self.records.read().await;
        IdentityResolver::new(&records).classify(id)
    }

    /// Order a record appended to `parent_id` would get
    pub async fn next_order(&self, parent_id: Option<&str>) -> u32 {
        let records = self.records.read().await;
        tree::next_order(&records, parent_id)
    }

    /// Fetch the server's list and merge it into local state.
    ///
    /// A failed fetch is returned as an error and an empty list is skipped;
    /// in both cases local state is untouched.
    pub async fn refresh(&self) -> Result<RefreshOutcome> {
        let snapshot = self.api.fetch_bookmarks().await?;
        self.apply_server_snapshot(snapshot).await
    }

    /// Merge an already fetched server list into local state
    pub async fn apply_server_snapshot(&self, snapshot: Vec<ServerBookmark>) -> Result<RefreshOutcome> {
        if snapshot.is_empty() {
            debug!("Server returned no bookmarks, skipping reconciliation");
            return Ok(RefreshOutcome::Skipped);
        }

        let mut records = self.records.write().await;
        self.ensure_loaded(&mut records).await?;
        let merge = reconcile(&records, snapshot);
        self.cache.save(&merge.records).await?;

        let outcome = RefreshOutcome::from(&merge);
        let total = merge.records.len();
        *records = merge.records;
        drop(records);

        self.publish_changed(total, ChangeSource::Reconcile);
        Ok(outcome)
    }

    /// Append records read from the browser's own bookmarks.
    ///
    /// Records must be local-only; anything already known by id is skipped.
    /// Returns the number of records added.
    pub async fn import_records(&self, imported: Vec<BookmarkRecord>) -> Result<usize> {
        let mut records = self.records.write().await;
        self.ensure_loaded(&mut records).await?;

        // Parents outside the imported batch must be existing folders
        let resolver = IdentityResolver::new(&records);
        for parent in imported
            .iter()
            .filter_map(|r| r.parent_id.as_deref())
            .filter(|p| !imported.iter().any(|r| r.answers_to(p)))
        {
            match resolver.find(parent) {
                Some(folder) if folder.is_folder() => {}
                Some(_) => return Err(ValidationError::NotAFolder { id: parent.to_string() }.into()),
                None => return Err(BookmarkSyncError::NotFound { id: parent.to_string() }),
            }
        }

        let fresh: Vec<BookmarkRecord> = imported
            .into_iter()
            .filter(|r| r.classify() == SyncState::LocalOnly)
            .filter(|r| IdentityResolver::new(&records).find(r.key()).is_none())
            .collect();
        let added = fresh.len();
        if added == 0 {
            return Ok(0);
        }

        let mut updated = records.clone();
        updated.extend(fresh);
        self.cache.save(&updated).await?;
        *records = updated;
        let total = records.len();
        drop(records);

        info!("Imported {} bookmarks", added);
        self.publish_changed(total, ChangeSource::Import);
        Ok(added)
    }

    /// Flush the order queue now and announce the result
    pub async fn flush_pending_orders(&self) -> FlushReport {
        self.sync_trigger.cancel();
        let report = self.order_queue.flush().await;
        publish_flush(&self.events, &report);
        report
    }

    /// Schedule an order flush after the quiet period, restarting the
    /// period if one is already scheduled
    pub fn request_sync(&self) {
        self.sync_trigger.trigger();
    }

    pub fn sync_scheduled(&self) -> bool {
        self.sync_trigger.is_pending()
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn order_queue(&self) -> &OrderSyncQueue {
        &self.order_queue
    }

    pub(crate) fn publish_changed(&self, count: usize, source: ChangeSource) {
        self.events.publish(BookmarkEvent::BookmarksChanged { count, source });
    }
}

fn publish_flush(events: &EventBus, report: &FlushReport) {
    if let Some(error) = &report.last_error {
        warn!("Deferred order sync incomplete: {}", error);
    }
    events.publish(BookmarkEvent::OrderSyncCompleted {
        synced: report.synced,
        remaining: report.remaining,
    });
}

/// Queue entry carrying the current order of the folder `parent_id`.
///
/// The folder and its children are sent by server id; children the server
/// does not know yet are left out. `None` when the folder itself has not
/// been synced.
pub(crate) fn pending_order_for(records: &[BookmarkRecord], parent_id: Option<&str>) -> Option<FolderOrderPending> {
    let folder_key = match parent_id {
        None => FolderKey::root(),
        Some(parent) => {
            let server_id = IdentityResolver::new(records).server_id_for(parent)?;
            FolderKey::for_parent(Some(server_id.as_str()))
        }
    };

    let bookmarks = tree::children_of(records, parent_id)
        .into_iter()
        .filter_map(|r| {
            r.resolve_server_id().map(|id| OrderEntry {
                id: id.to_string(),
                order: r.order,
            })
        })
        .collect();

    Some(FolderOrderPending::new(folder_key, bookmarks))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use api_client::{ApiResult, TokenSession};
    use async_trait::async_trait;
    use data_access::{MemoryStore, StorageResult, BOOKMARKS_KEY};
    use std::collections::HashSet;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex as StdMutex;

    /// Memory store that can fail its next reads or every write to a key
    #[derive(Default)]
    pub(crate) struct FlakyStore {
        pub inner: MemoryStore,
        failing_reads: AtomicUsize,
        failing_writes: StdMutex<HashSet<String>>,
    }

    impl FlakyStore {
        pub fn over(inner: MemoryStore) -> Self {
            Self {
                inner,
                ..Self::default()
            }
        }

        pub fn fail_next_reads(&self, count: usize) {
            self.failing_reads.store(count, Ordering::SeqCst);
        }

        pub fn fail_writes_to(&self, key: &str) {
            self.failing_writes.lock().unwrap().insert(key.to_string());
        }

        fn write_check(&self, key: &str) -> StorageResult<()> {
            if self.failing_writes.lock().unwrap().contains(key) {
                return Err(StorageError::Backend {
                    details: "database is locked".to_string(),
                });
            }
            Ok(())
        }
    }

    #[async_trait]
    impl KeyValueStore for FlakyStore {
        async fn get(&self, key: &str) -> StorageResult<Option<serde_json::Value>> {
            let failing = self
                .failing_reads
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok();
            if failing {
                return Err(StorageError::Backend {
                    details: "disk I/O error".to_string(),
                });
            }
            self.inner.get(key).await
        }

        async fn set(&self, key: &str, value: serde_json::Value) -> StorageResult<()> {
            self.write_check(key)?;
            self.inner.set(key, value).await
        }

        async fn remove(&self, key: &str) -> StorageResult<()> {
            self.write_check(key)?;
            self.inner.remove(key).await
        }
    }

    /// In-process stand-in for the bookmark server
    #[derive(Default)]
    pub(crate) struct FakeApi {
        pub server: StdMutex<Vec<ServerBookmark>>,
        pub next_id: StdMutex<u32>,
        pub offline: StdMutex<bool>,
        pub orders: StdMutex<Vec<OrderPayload>>,
        pub deleted: StdMutex<Vec<String>>,
        pub created: StdMutex<Vec<BookmarkPayload>>,
    }

    impl FakeApi {
        pub fn with(records: Vec<ServerBookmark>) -> Self {
            let api = Self::default();
            *api.server.lock().unwrap() = records;
            api
        }

        pub fn go_offline(&self) {
            *self.offline.lock().unwrap() = true;
        }

        fn check(&self) -> ApiResult<()> {
            if *self.offline.lock().unwrap() {
                Err(ApiError::Network {
                    details: "connection refused".to_string(),
                })
            } else {
                Ok(())
            }
        }
    }

    pub(crate) fn server(id: &str, parent: Option<&str>, order: u32, kind: BookmarkType) -> ServerBookmark {
        ServerBookmark {
            id: id.to_string(),
            offline_id: None,
            kind,
            parent_id: parent.map(str::to_string),
            title: id.to_uppercase(),
            url: match kind {
                BookmarkType::Bookmark => Some(format!("https://{}.example", id)),
                BookmarkType::Folder => None,
            },
            order,
            is_manageable: true,
            presentation: Presentation::default(),
        }
    }

    #[async_trait]
    impl BookmarkApi for FakeApi {
        async fn fetch_bookmarks(&self) -> ApiResult<Vec<ServerBookmark>> {
            self.check()?;
            Ok(self.server.lock().unwrap().clone())
        }

        async fn create_bookmark(&self, payload: &BookmarkPayload) -> ApiResult<ServerBookmark> {
            self.check()?;
            self.created.lock().unwrap().push(payload.clone());
            let mut next = self.next_id.lock().unwrap();
            *next += 1;
            let created = ServerBookmark {
                id: format!("new{}", next),
                offline_id: None,
                kind: payload.kind,
                parent_id: payload.parent_id.clone(),
                title: payload.title.clone(),
                url: payload.url.clone(),
                order: payload.order,
                is_manageable: true,
                presentation: payload.presentation.clone(),
            };
            self.server.lock().unwrap().push(created.clone());
            Ok(created)
        }

        async fn update_bookmark(&self, server_id: &str, payload: &BookmarkPayload) -> ApiResult<ServerBookmark> {
            self.check()?;
            let mut server = self.server.lock().unwrap();
            let record = server
                .iter_mut()
                .find(|r| r.id == server_id)
                .ok_or_else(|| ApiError::Status {
                    status: 404,
                    message: "not found".to_string(),
                })?;
            record.title = payload.title.clone();
            record.url = payload.url.clone();
            record.presentation = payload.presentation.clone();
            Ok(record.clone())
        }

        async fn delete_bookmark(&self, server_id: &str) -> ApiResult<()> {
            self.check()?;
            self.deleted.lock().unwrap().push(server_id.to_string());
            let mut server = self.server.lock().unwrap();
            let mut doomed = vec![server_id.to_string()];
            while let Some(id) = doomed.pop() {
                doomed.extend(
                    server
                        .iter()
                        .filter(|r| r.parent_id.as_deref() == Some(id.as_str()))
                        .map(|r| r.id.clone()),
                );
                server.retain(|r| r.id != id);
            }
            Ok(())
        }

        async fn update_order(&self, order: &OrderPayload) -> ApiResult<()> {
            self.check()?;
            self.orders.lock().unwrap().push(order.clone());
            Ok(())
        }
    }

    pub(crate) struct Harness {
        pub store: BookmarkStore,
        pub kv: MemoryStore,
        pub flaky: Arc<FlakyStore>,
        pub api: Arc<FakeApi>,
        pub session: TokenSession,
    }

    pub(crate) fn harness(api: FakeApi) -> Harness {
        let kv = MemoryStore::new();
        let flaky = Arc::new(FlakyStore::over(kv.clone()));
        let api = Arc::new(api);
        let session = TokenSession::new(Some("token".to_string()));
        let store = BookmarkStore::new(
            flaky.clone(),
            api.clone(),
            Arc::new(session.clone()),
            EventBus::new(),
            BookmarkStoreConfig {
                sync_debounce: Duration::from_millis(20),
            },
        );
        Harness {
            store,
            kv,
            flaky,
            api,
            session,
        }
    }

    pub(crate) async fn cached(kv: &MemoryStore) -> Option<serde_json::Value> {
        kv.get(BOOKMARKS_KEY).await.unwrap()
    }

    #[tokio::test]
    async fn test_refresh_reconciles_and_persists() {
        let h = harness(FakeApi::with(vec![
            server("f1", None, 0, BookmarkType::Folder),
            server("b1", Some("f1"), 0, BookmarkType::Bookmark),
        ]));

        let outcome = h.store.refresh().await.unwrap();
        assert_eq!(
            outcome,
            RefreshOutcome::Reconciled {
                total: 2,
                local_survivors: 0,
                confirmed: 0
            }
        );
        assert_eq!(h.store.children_of(Some("f1")).await.len(), 1);
        assert_eq!(cached(&h.kv).await.unwrap().as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_empty_snapshot_leaves_state_alone() {
        let h = harness(FakeApi::default());
        let local = BookmarkRecord::new_local(BookmarkType::Folder, "Offline", None, None, 0);
        h.store.import_records(vec![local]).await.unwrap();

        assert_eq!(h.store.refresh().await.unwrap(), RefreshOutcome::Skipped);
        assert_eq!(h.store.len().await, 1);
    }

    #[tokio::test]
    async fn test_failed_fetch_leaves_state_alone() {
        let h = harness(FakeApi::with(vec![server("b1", None, 0, BookmarkType::Bookmark)]));
        h.store.refresh().await.unwrap();
        h.api.go_offline();

        let err = h.store.refresh().await.unwrap_err();
        assert!(matches!(err, BookmarkSyncError::NetworkOrServer { .. }));
        assert_eq!(h.store.len().await, 1);
    }

    #[tokio::test]
    async fn test_load_reads_cache_and_publishes() {
        let h = harness(FakeApi::default());
        let record = BookmarkRecord::new_local(BookmarkType::Bookmark, "A", Some("https://a.example".to_string()), None, 0);
        h.kv
            .set(BOOKMARKS_KEY, serde_json::to_value(vec![record]).unwrap())
            .await
            .unwrap();

        let seen = Arc::new(StdMutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        h.store.events().subscribe(crate::events::Topic::Bookmarks, move |event| {
            sink.lock().unwrap().push(event.clone());
        });

        assert_eq!(h.store.load().await.unwrap(), 1);
        assert!(h.store.is_loaded());
        assert_eq!(
            *seen.lock().unwrap(),
            vec![BookmarkEvent::BookmarksChanged {
                count: 1,
                source: ChangeSource::CacheLoad
            }]
        );
    }

    #[tokio::test]
    async fn test_failed_cache_read_keeps_offline_records() {
        let h = harness(FakeApi::with(vec![server("srv1", None, 0, BookmarkType::Bookmark)]));
        let offline = BookmarkRecord::new_local(BookmarkType::Folder, "Offline", None, None, 0);
        h.kv
            .set(BOOKMARKS_KEY, serde_json::to_value(vec![offline.clone()]).unwrap())
            .await
            .unwrap();

        h.flaky.fail_next_reads(1);
        let err = h.store.load().await.unwrap_err();
        assert!(matches!(err, BookmarkSyncError::Storage { .. }));
        assert!(!h.store.is_loaded());

        // The refresh reads the cache again before merging into it
        h.store.refresh().await.unwrap();
        let stored: Vec<BookmarkRecord> = serde_json::from_value(cached(&h.kv).await.unwrap()).unwrap();
        let keys: Vec<&str> = stored.iter().map(|r| r.key()).collect();
        assert_eq!(keys, vec!["srv1", offline.key()]);
    }

    #[tokio::test]
    async fn test_unreadable_cache_is_never_overwritten() {
        let h = harness(FakeApi::with(vec![server("srv1", None, 0, BookmarkType::Bookmark)]));
        let offline = BookmarkRecord::new_local(BookmarkType::Folder, "Offline", None, None, 0);
        let seeded = serde_json::to_value(vec![offline]).unwrap();
        h.kv.set(BOOKMARKS_KEY, seeded.clone()).await.unwrap();

        h.flaky.fail_next_reads(2);
        assert!(h.store.load().await.is_err());
        let err = h.store.refresh().await.unwrap_err();
        assert!(matches!(err, BookmarkSyncError::Storage { .. }));
        assert_eq!(cached(&h.kv).await, Some(seeded));
        assert!(h.store.is_empty().await);
    }

    #[tokio::test]
    async fn test_import_rejects_unknown_parent() {
        let h = harness(FakeApi::default());
        let orphan = BookmarkRecord::new_local(
            BookmarkType::Bookmark,
            "A",
            Some("https://a.example".to_string()),
            Some("missing".to_string()),
            0,
        );

        let err = h.store.import_records(vec![orphan]).await.unwrap_err();
        assert!(matches!(err, BookmarkSyncError::NotFound { .. }));
        assert!(cached(&h.kv).await.is_none());
    }

    #[tokio::test]
    async fn test_import_skips_synced_and_known_records() {
        let h = harness(FakeApi::default());
        let folder = BookmarkRecord::new_local(BookmarkType::Folder, "Imported", None, None, 0);
        let child = BookmarkRecord::new_local(
            BookmarkType::Bookmark,
            "A",
            Some("https://a.example".to_string()),
            Some(folder.key().to_string()),
            0,
        );
        assert_eq!(h.store.import_records(vec![folder.clone(), child]).await.unwrap(), 2);
        assert_eq!(h.store.import_records(vec![folder]).await.unwrap(), 0);
        assert_eq!(h.store.len().await, 2);
    }

    #[test]
    fn test_pending_order_uses_server_ids() {
        let folder = BookmarkRecord::from(server("f1", None, 0, BookmarkType::Folder));
        let synced = BookmarkRecord::from(server("b1", Some("f1"), 1, BookmarkType::Bookmark));
        let local = BookmarkRecord::new_local(
            BookmarkType::Bookmark,
            "L",
            Some("https://l.example".to_string()),
            Some("f1".to_string()),
            0,
        );
        let records = vec![folder, synced, local];

        let entry = pending_order_for(&records, Some("f1")).unwrap();
        assert_eq!(entry.folder_id.as_str(), "f1");
        assert_eq!(entry.bookmarks, vec![OrderEntry { id: "b1".to_string(), order: 1 }]);

        let root = pending_order_for(&records, None).unwrap();
        assert!(root.folder_id.is_root());
    }

    #[test]
    fn test_no_pending_order_for_unsynced_folder() {
        let folder = BookmarkRecord::new_local(BookmarkType::Folder, "Offline", None, None, 0);
        let key = folder.key().to_string();
        assert!(pending_order_for(&[folder], Some(&key)).is_none());
    }
}
