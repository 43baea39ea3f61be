//! Native bookmark provider trait

use async_trait::async_trait;
use bookmark_sync_core::ImportError;
use serde::{Deserialize, Serialize};

/// A node of the browser's own bookmark tree. Nodes without a URL are folders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeBookmarkNode {
    pub title: String,
    pub url: Option<String>,
    pub children: Vec<NativeBookmarkNode>,
}

impl NativeBookmarkNode {
    pub fn link(title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            url: Some(url.into()),
            children: Vec::new(),
        }
    }

    pub fn folder(title: impl Into<String>, children: Vec<NativeBookmarkNode>) -> Self {
        Self {
            title: title.into(),
            url: None,
            children,
        }
    }

    pub fn is_folder(&self) -> bool {
        self.url.is_none()
    }

    /// Number of links in this subtree
    pub fn link_count(&self) -> usize {
        if self.is_folder() {
            self.children.iter().map(NativeBookmarkNode::link_count).sum()
        } else {
            1
        }
    }
}

/// Source of browser-owned bookmarks
#[async_trait]
pub trait NativeBookmarkProvider: Send + Sync {
    /// Human-readable name of the source
    fn name(&self) -> String;

    /// Read the current top-level nodes
    async fn read_tree(&self) -> Result<Vec<NativeBookmarkNode>, ImportError>;
}
