/// Integration module for the bookmark sync engine
///
/// Wires storage, the REST client and the bookmark store together and owns
/// the background work: startup flush, periodic refresh and the
/// sync-request subscription.

use anyhow::Context;
use api_client::{BookmarkApi, HttpBookmarkApi, TokenSession};
use bookmark_manager::{
    BookmarkEvent, BookmarkStore, BookmarkStoreConfig, EventBus, Subscription, SyncState, Topic,
};
use bookmark_sync_core::Result;
use browser_connector::{
    detect_bookmark_sources, flatten_native_tree, BookmarkSource, ChromiumBookmarkProvider, NativeBookmarkProvider,
};
use data_access::{KeyValueStore, MemoryStore, SqliteStore};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

pub mod application;
pub mod error_handler;
pub mod logger;

pub use application::{Application, StartupReport};
pub use error_handler::{ErrorEntry, ErrorSeverity, ErrorStatistics, UnifiedErrorHandler};
pub use logger::{LoggerConfig, UnifiedLogger};

/// Application configuration
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Base URL of the bookmark REST API
    pub api_base_url: String,

    /// Session token; `None` starts signed out
    pub api_token: Option<String>,

    /// Database path; `None` keeps everything in memory
    pub database_path: Option<PathBuf>,

    /// Quiet period after a reorder before folder orders are sent
    pub sync_debounce_ms: u64,

    /// Background refresh interval; `None` disables it
    pub refresh_interval_secs: Option<u64>,

    /// Flush pending folder orders when the application starts
    pub flush_on_startup: bool,

    /// Log level
    pub log_level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:3000/api/".to_string(),
            api_token: None,
            database_path: None,
            sync_debounce_ms: 1500,
            refresh_interval_secs: None,
            flush_on_startup: true,
            log_level: "info".to_string(),
        }
    }
}

impl AppConfig {
    /// Load a JSON configuration file; missing fields take their defaults
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Invalid config file {}", path.display()))
    }

    pub fn store_config(&self) -> BookmarkStoreConfig {
        BookmarkStoreConfig {
            sync_debounce: Duration::from_millis(self.sync_debounce_ms),
        }
    }
}

/// Application context that holds all initialized components
pub struct AppContext {
    /// Key-value storage backing the cache and the order queue
    pub storage: Arc<dyn KeyValueStore>,

    /// Bookmark state container
    pub store: Arc<BookmarkStore>,

    /// Session shared with the REST client
    pub session: TokenSession,

    /// Event bus owned by the application
    pub events: EventBus,

    /// Unified error handler
    pub error_handler: Arc<UnifiedErrorHandler>,

    /// Application configuration
    pub config: Arc<RwLock<AppConfig>>,

    sync_subscription: Mutex<Option<Subscription>>,
    refresh_task: Mutex<Option<JoinHandle<()>>>,
}

impl AppContext {
    /// Create a context with SQLite (or in-memory) storage and the HTTP client
    pub async fn new(config: AppConfig) -> anyhow::Result<Self> {
        info!("Initializing application context");

        let storage: Arc<dyn KeyValueStore> = match &config.database_path {
            Some(path) => Arc::new(SqliteStore::open(path).await?),
            None => Arc::new(MemoryStore::new()),
        };
        info!("Storage initialized");

        let session = TokenSession::new(config.api_token.clone());
        let api = HttpBookmarkApi::new(&config.api_base_url, session.clone())?;

        Ok(Self::with_components(config, storage, Arc::new(api), session))
    }

    /// Create a context over caller-provided storage and API
    pub fn with_components(
        config: AppConfig,
        storage: Arc<dyn KeyValueStore>,
        api: Arc<dyn BookmarkApi>,
        session: TokenSession,
    ) -> Self {
        let events = EventBus::new();
        let store = Arc::new(BookmarkStore::new(
            Arc::clone(&storage),
            api,
            Arc::new(session.clone()),
            events.clone(),
            config.store_config(),
        ));

        let subscription = subscribe_sync_requests(&events, &store);

        info!("Application context initialized successfully");

        Self {
            storage,
            store,
            session,
            events,
            error_handler: Arc::new(UnifiedErrorHandler::new()),
            config: Arc::new(RwLock::new(config)),
            sync_subscription: Mutex::new(Some(subscription)),
            refresh_task: Mutex::new(None),
        }
    }

    /// Start refetching from the server every `interval`, replacing any
    /// running refresh task. Failures go to the error handler.
    pub fn start_periodic_refresh(&self, interval: Duration) {
        let store = Arc::clone(&self.store);
        let error_handler = Arc::clone(&self.error_handler);

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // The first tick completes immediately
            ticker.tick().await;
            loop {
                ticker.tick().await;
                debug!("Periodic bookmark refresh");
                if let Err(e) = store.refresh().await {
                    error_handler.handle_error(&e, "periodic_refresh").await;
                }
            }
        });

        let mut slot = self.refresh_task.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(previous) = slot.replace(task) {
            previous.abort();
        }
        info!("Periodic refresh every {:?}", interval);
    }

    pub fn stop_periodic_refresh(&self) {
        let mut slot = self.refresh_task.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(task) = slot.take() {
            task.abort();
        }
    }

    pub fn periodic_refresh_running(&self) -> bool {
        let slot = self.refresh_task.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        slot.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Import the browser's own bookmarks below `parent_id`, after the
    /// folder's existing entries
    pub async fn import_from_browser(
        &self,
        provider: &dyn NativeBookmarkProvider,
        parent_id: Option<&str>,
    ) -> Result<usize> {
        info!("Importing bookmarks from {}", provider.name());
        let nodes = provider.read_tree().await?;
        let first_order = self.store.next_order(parent_id).await;
        let records = flatten_native_tree(&nodes, parent_id, first_order);
        self.store.import_records(records).await
    }

    /// Browser bookmark files available for import on this machine
    pub async fn browser_sources(&self) -> Vec<BookmarkSource> {
        detect_bookmark_sources().await
    }

    /// Import from a source returned by [`AppContext::browser_sources`]
    pub async fn import_from_source(&self, source: &BookmarkSource, parent_id: Option<&str>) -> Result<usize> {
        let provider = ChromiumBookmarkProvider::from(source);
        self.import_from_browser(&provider, parent_id).await
    }

    /// Get application statistics
    pub async fn get_stats(&self) -> AppStatistics {
        let records = self.store.snapshot().await;
        let local_only = records
            .iter()
            .filter(|r| r.classify() == SyncState::LocalOnly)
            .count();

        AppStatistics {
            total_bookmarks: records.len(),
            folders: records.iter().filter(|r| r.is_folder()).count(),
            local_only,
            pending_orders: self.store.order_queue().pending_count().await.unwrap_or_default(),
        }
    }

    /// Shutdown all components gracefully
    pub async fn shutdown(&self) -> Result<()> {
        info!("Shutting down application context");

        self.stop_periodic_refresh();

        let subscription = self
            .sync_subscription
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        if let Some(subscription) = subscription {
            subscription.unsubscribe();
        }

        // Pending orders stay queued for the next start
        match self.store.order_queue().pending_count().await {
            Ok(0) => {}
            Ok(pending) => info!("{} folder orders left for the next sync", pending),
            Err(e) => warn!("Could not read pending folder orders: {}", e),
        }

        info!("Application context shutdown complete");
        Ok(())
    }
}

/// Flush the order queue whenever a sync is requested on the bus
fn subscribe_sync_requests(events: &EventBus, store: &Arc<BookmarkStore>) -> Subscription {
    let store = Arc::downgrade(store);
    events.subscribe(Topic::Sync, move |event| {
        if !matches!(event, BookmarkEvent::SyncRequested) {
            return;
        }
        let Some(store) = store.upgrade() else {
            return;
        };
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                runtime.spawn(async move {
                    store.flush_pending_orders().await;
                });
            }
            Err(_) => warn!("Sync requested outside the runtime, ignoring"),
        }
    })
}

/// Application statistics
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct AppStatistics {
    pub total_bookmarks: usize,
    pub folders: usize,
    /// Records the server has not confirmed yet
    pub local_only: usize,
    /// Folders whose order is waiting to be sent
    pub pending_orders: usize,
}
