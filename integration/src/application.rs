/// Main application module
///
/// Provides high-level Application API

use crate::{AppConfig, AppContext, LoggerConfig, UnifiedLogger};
use bookmark_manager::{
    BookmarkEvent, BookmarkPatch, BookmarkRecord, FlushReport, NewBookmark, RefreshOutcome, ReorderTarget,
};
use bookmark_sync_core::Result;
use browser_connector::NativeBookmarkProvider;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// What happened during [`Application::start`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartupReport {
    /// Records read from the local cache; `None` when it could not be read
    pub loaded: Option<usize>,
    /// Result of the startup order flush, if one ran
    pub flush: Option<FlushReport>,
    /// Result of the initial refresh; `None` when it failed
    pub refresh: Option<RefreshOutcome>,
}

/// Main application
pub struct Application {
    /// Application context
    context: Arc<AppContext>,
}

impl Application {
    /// Create and initialize a new application
    pub async fn new(config: AppConfig) -> anyhow::Result<Self> {
        UnifiedLogger::init(LoggerConfig::with_level(config.log_level.clone()))?;

        info!("Starting bookmark sync application");

        let context = Arc::new(AppContext::new(config).await?);
        Ok(Self { context })
    }

    /// Wrap an already built context
    pub fn from_context(context: AppContext) -> Self {
        Self {
            context: Arc::new(context),
        }
    }

    /// Load the cache, send queued folder orders, then merge the server's
    /// list. Network failures are recorded but do not stop startup.
    pub async fn start(&self) -> StartupReport {
        let config = self.context.config.read().await.clone();
        let store = &self.context.store;

        // An unreadable cache is retried by the first write
        let loaded = self.report("startup_load", store.load().await).await.ok();

        let flush = if config.flush_on_startup {
            Some(store.flush_pending_orders().await)
        } else {
            None
        };

        let refresh = self.report("startup_refresh", store.refresh().await).await.ok();

        if let Some(secs) = config.refresh_interval_secs.filter(|secs| *secs > 0) {
            self.context.start_periodic_refresh(Duration::from_secs(secs));
        }

        info!("Application started with {} cached bookmarks", loaded.unwrap_or_default());
        StartupReport { loaded, flush, refresh }
    }

    /// Shutdown the application
    pub async fn shutdown(&self) -> Result<()> {
        info!("Shutting down application");
        self.context.shutdown().await?;
        info!("Application shutdown complete");
        Ok(())
    }

    /// Get application context
    pub fn context(&self) -> &Arc<AppContext> {
        &self.context
    }

    // High-level API methods

    pub async fn add_bookmark(&self, input: NewBookmark) -> Result<BookmarkRecord> {
        let result = self.context.store.add(input).await;
        self.report("add_bookmark", result).await
    }

    pub async fn edit_bookmark(&self, id: &str, patch: BookmarkPatch) -> Result<BookmarkRecord> {
        let result = self.context.store.edit(id, patch).await;
        self.report("edit_bookmark", result).await
    }

    pub async fn delete_bookmark(&self, id: &str) -> Result<usize> {
        let result = self.context.store.delete(id).await;
        self.report("delete_bookmark", result).await
    }

    pub async fn reorder_bookmark(&self, id: &str, target: ReorderTarget) -> Result<()> {
        let result = self.context.store.reorder(id, target).await;
        self.report("reorder_bookmark", result).await
    }

    pub async fn refresh(&self) -> Result<RefreshOutcome> {
        let result = self.context.store.refresh().await;
        self.report("refresh", result).await
    }

    /// Ask for the queued folder orders to be sent now
    pub fn sync_now(&self) {
        self.context.events.publish(BookmarkEvent::SyncRequested);
    }

    pub async fn import_from_browser(
        &self,
        provider: &dyn NativeBookmarkProvider,
        parent_id: Option<&str>,
    ) -> Result<usize> {
        let result = self.context.import_from_browser(provider, parent_id).await;
        self.report("import_from_browser", result).await
    }

    /// Children of a folder (`None` for the root), in display order
    pub async fn children(&self, parent_id: Option<&str>) -> Vec<BookmarkRecord> {
        self.context.store.children_of(parent_id).await
    }

    /// Get application statistics
    pub async fn get_stats(&self) -> crate::AppStatistics {
        self.context.get_stats().await
    }

    async fn report<T>(&self, context: &str, result: Result<T>) -> Result<T> {
        if let Err(e) = &result {
            self.context.error_handler.handle_error(e, context).await;
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_application_creation() {
        let app = Application::new(AppConfig::default()).await;
        assert!(app.is_ok());
    }

    #[tokio::test]
    async fn test_application_lifecycle() {
        let config = AppConfig {
            // Nothing listens here, so the startup refresh fails fast
            api_base_url: "http://127.0.0.1:9/".to_string(),
            ..AppConfig::default()
        };
        let app = Application::new(config).await.unwrap();

        let report = app.start().await;
        assert_eq!(report.loaded, Some(0));
        assert!(report.refresh.is_none());
        assert!(report.flush.unwrap().is_complete());
        assert_eq!(app.context().error_handler.get_error_stats().await.warnings, 1);

        assert!(app.shutdown().await.is_ok());
    }
}
