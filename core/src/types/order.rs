//! Pending folder-order entries for the deferred order-sync queue.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Queue key used for the root folder, which has no id of its own
pub const ROOT_FOLDER_KEY: &str = "__root__";

/// Normalized folder identity used as the queue key
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FolderKey(String);

impl FolderKey {
    pub fn root() -> Self {
        FolderKey(ROOT_FOLDER_KEY.to_string())
    }

    /// Key for the folder a `parentId` points at (`None` is the root)
    pub fn for_parent(parent_id: Option<&str>) -> Self {
        match parent_id {
            Some(id) => FolderKey(id.to_string()),
            None => Self::root(),
        }
    }

    pub fn is_root(&self) -> bool {
        self.0 == ROOT_FOLDER_KEY
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The folder id as the server expects it (`None` for the root)
    pub fn folder_id(&self) -> Option<&str> {
        if self.is_root() {
            None
        } else {
            Some(&self.0)
        }
    }
}

impl std::fmt::Display for FolderKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Position of one bookmark inside its folder
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderEntry {
    pub id: String,
    pub order: u32,
}

/// Folder order waiting to be sent to the server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FolderOrderPending {
    pub folder_id: FolderKey,
    pub bookmarks: Vec<OrderEntry>,
    pub queued_at: DateTime<Utc>,
}

impl FolderOrderPending {
    pub fn new(folder_id: FolderKey, bookmarks: Vec<OrderEntry>) -> Self {
        Self {
            folder_id,
            bookmarks,
            queued_at: Utc::now(),
        }
    }

    /// Body of `PUT /bookmarks/order`
    pub fn to_payload(&self) -> OrderPayload {
        OrderPayload {
            folder_id: self.folder_id.folder_id().map(str::to_string),
            bookmarks: self.bookmarks.clone(),
        }
    }
}

/// Request body for the order endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderPayload {
    pub folder_id: Option<String>,
    pub bookmarks: Vec<OrderEntry>,
}
