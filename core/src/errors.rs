use thiserror::Error;

/// Input rejected before any I/O is attempted
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Title must not be empty")]
    EmptyTitle,

    #[error("A bookmark requires a URL")]
    MissingUrl,

    #[error("A folder cannot have a URL")]
    UrlNotAllowed,

    #[error("Target is not a folder: {id}")]
    NotAFolder { id: String },

    #[error("Cannot move a folder into itself or its descendants: {id}")]
    CyclicMove { id: String },
}

/// Failures reported by the REST client
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    #[error("Network error: {details}")]
    Network { details: String },

    #[error("Server responded with {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Invalid response body: {details}")]
    Decode { details: String },
}

/// Key-value store related errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Storage backend error: {details}")]
    Backend { details: String },

    #[error("Serialization error: {source}")]
    Serialization {
        #[from]
        source: serde_json::Error,
    },
}

/// Native bookmark import errors
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("No bookmark file found for {browser}")]
    SourceNotFound { browser: String },

    #[error("IO error: {source}")]
    IO {
        #[from]
        source: std::io::Error,
    },

    #[error("Malformed bookmark file: {source}")]
    Parse {
        #[from]
        source: serde_json::Error,
    },
}

/// Main error type for bookmark operations
#[derive(Debug, Error)]
pub enum BookmarkSyncError {
    #[error("Authentication required")]
    AuthRequired,

    #[error("Bookmark not yet synced: {id}")]
    NotYetSynced { id: String },

    #[error("Bookmark not found: {id}")]
    NotFound { id: String },

    #[error("Bookmark cannot be modified: {id}")]
    NotManageable { id: String },

    #[error("Validation error: {source}")]
    Validation {
        #[from]
        source: ValidationError,
    },

    #[error("Network or server error: {source}")]
    NetworkOrServer {
        #[from]
        source: ApiError,
    },

    #[error("Storage error: {source}")]
    Storage {
        #[from]
        source: StorageError,
    },

    #[error("Import error: {source}")]
    Import {
        #[from]
        source: ImportError,
    },
}

impl BookmarkSyncError {
    /// Text shown to the user when an immediate mutation fails
    pub fn user_message(&self) -> String {
        match self {
            BookmarkSyncError::AuthRequired => "Please sign in to manage your bookmarks.".to_string(),
            BookmarkSyncError::NotYetSynced { .. } => {
                "This bookmark has not been synchronized yet. Please synchronize and try again.".to_string()
            }
            BookmarkSyncError::NotFound { .. } => "This bookmark no longer exists.".to_string(),
            BookmarkSyncError::NotManageable { .. } => "You are not allowed to change this bookmark.".to_string(),
            BookmarkSyncError::Validation { source } => source.to_string(),
            BookmarkSyncError::NetworkOrServer { .. } => {
                "Could not reach the bookmark server. Please try again later.".to_string()
            }
            BookmarkSyncError::Storage { .. } => "Could not save bookmarks on this device.".to_string(),
            BookmarkSyncError::Import { .. } => "Could not import bookmarks from the browser.".to_string(),
        }
    }

    /// Whether retrying the same call later could succeed without user action
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            BookmarkSyncError::NetworkOrServer { .. } | BookmarkSyncError::Storage { .. }
        )
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, BookmarkSyncError>;
