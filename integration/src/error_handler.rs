/// Unified error handler for centralized error management

use bookmark_sync_core::BookmarkSyncError;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{error, info, warn};

/// Error severity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ErrorSeverity {
    /// Local data may be lost or stale
    Critical,
    /// Error that affects functionality
    Error,
    /// Expected to clear up on its own or after signing in
    Warning,
    /// Rejected user input; the message tells the user what to do
    Info,
}

/// Error entry for tracking
#[derive(Debug, Clone)]
pub struct ErrorEntry {
    pub error: String,
    /// Text shown to the user
    pub user_message: String,
    pub severity: ErrorSeverity,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub context: String,
}

/// Unified error handler
pub struct UnifiedErrorHandler {
    /// Recent errors, oldest first
    recent_errors: Arc<RwLock<VecDeque<ErrorEntry>>>,
    max_errors: usize,
}

impl UnifiedErrorHandler {
    pub fn new() -> Self {
        Self::with_capacity(100)
    }

    /// Handler that remembers at most `max_errors` entries
    pub fn with_capacity(max_errors: usize) -> Self {
        Self {
            recent_errors: Arc::new(RwLock::new(VecDeque::with_capacity(max_errors))),
            max_errors,
        }
    }

    /// Log and record an error; returns the severity it was filed under
    pub async fn handle_error(&self, error: &BookmarkSyncError, context: &str) -> ErrorSeverity {
        let severity = Self::classify_error(error);

        match severity {
            ErrorSeverity::Critical => error!("{} failed, local data at risk: {}", context, error),
            ErrorSeverity::Error => error!("{} failed: {}", context, error),
            ErrorSeverity::Warning => warn!("{} failed: {}", context, error),
            ErrorSeverity::Info => info!("{} rejected: {}", context, error),
        }

        let mut errors = self.recent_errors.write().await;
        if errors.len() == self.max_errors {
            errors.pop_front();
        }
        if self.max_errors > 0 {
            errors.push_back(ErrorEntry {
                error: error.to_string(),
                user_message: error.user_message(),
                severity,
                timestamp: chrono::Utc::now(),
                context: context.to_string(),
            });
        }
        severity
    }

    pub fn classify_error(error: &BookmarkSyncError) -> ErrorSeverity {
        use BookmarkSyncError::*;

        match error {
            AuthRequired | NetworkOrServer { .. } => ErrorSeverity::Warning,
            NotYetSynced { .. } | NotFound { .. } | NotManageable { .. } | Validation { .. } => {
                ErrorSeverity::Info
            }
            Storage { .. } => ErrorSeverity::Critical,
            Import { .. } => ErrorSeverity::Error,
        }
    }

    pub async fn get_recent_errors(&self) -> Vec<ErrorEntry> {
        self.recent_errors.read().await.iter().cloned().collect()
    }

    /// Message to show for the most recent error, if any
    pub async fn last_user_message(&self) -> Option<String> {
        self.recent_errors
            .read()
            .await
            .back()
            .map(|entry| entry.user_message.clone())
    }

    pub async fn get_error_stats(&self) -> ErrorStatistics {
        self.recent_errors
            .read()
            .await
            .iter()
            .fold(ErrorStatistics::default(), |mut stats, entry| {
                stats.record(entry.severity);
                stats
            })
    }

    pub async fn clear_errors(&self) {
        self.recent_errors.write().await.clear();
    }
}

impl Default for UnifiedErrorHandler {
    fn default() -> Self {
        Self::new()
    }
}

/// Error counts by severity
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ErrorStatistics {
    pub total: usize,
    pub critical: usize,
    pub errors: usize,
    pub warnings: usize,
    pub info: usize,
}

impl ErrorStatistics {
    fn record(&mut self, severity: ErrorSeverity) {
        self.total += 1;
        let bucket = match severity {
            ErrorSeverity::Critical => &mut self.critical,
            ErrorSeverity::Error => &mut self.errors,
            ErrorSeverity::Warning => &mut self.warnings,
            ErrorSeverity::Info => &mut self.info,
        };
        *bucket += 1;
    }
}
