//! Bookmark Import Module
//!
//! Locates and parses the bookmark file of Chromium-based browsers and
//! flattens the native tree into local-only bookmark records. Import is a
//! one-time copy: the imported records are never synchronised back with the
//! browser.

use crate::traits::{NativeBookmarkNode, NativeBookmarkProvider};
use async_trait::async_trait;
use bookmark_sync_core::*;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::result::Result;
use tracing::{debug, info};

const UNTITLED: &str = "Untitled";

/// Browsers whose bookmark file can be imported
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChromiumBrowser {
    Chrome,
    Edge,
}

impl ChromiumBrowser {
    pub fn all() -> [ChromiumBrowser; 2] {
        [ChromiumBrowser::Chrome, ChromiumBrowser::Edge]
    }

    /// Default-profile `Bookmarks` file for this browser on the current platform
    pub fn default_bookmark_path(&self) -> Option<PathBuf> {
        #[cfg(target_os = "windows")]
        {
            let vendor: &[&str] = match self {
                ChromiumBrowser::Chrome => &["Google", "Chrome"],
                ChromiumBrowser::Edge => &["Microsoft", "Edge"],
            };
            dirs::data_local_dir().map(|mut p| {
                for part in vendor {
                    p.push(part);
                }
                p.join("User Data").join("Default").join("Bookmarks")
            })
        }

        #[cfg(target_os = "linux")]
        {
            let dir = match self {
                ChromiumBrowser::Chrome => "google-chrome",
                ChromiumBrowser::Edge => "microsoft-edge",
            };
            dirs::config_dir().map(|p| p.join(dir).join("Default").join("Bookmarks"))
        }

        #[cfg(target_os = "macos")]
        {
            let vendor: &[&str] = match self {
                ChromiumBrowser::Chrome => &["Google", "Chrome"],
                ChromiumBrowser::Edge => &["Microsoft Edge"],
            };
            dirs::home_dir().map(|mut p| {
                p.push("Library");
                p.push("Application Support");
                for part in vendor {
                    p.push(part);
                }
                p.join("Default").join("Bookmarks")
            })
        }

        #[cfg(not(any(target_os = "windows", target_os = "linux", target_os = "macos")))]
        {
            None
        }
    }
}

impl std::fmt::Display for ChromiumBrowser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChromiumBrowser::Chrome => write!(f, "Chrome"),
            ChromiumBrowser::Edge => write!(f, "Edge"),
        }
    }
}

/// Bookmark source offered to the user for import
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookmarkSource {
    pub browser: ChromiumBrowser,
    pub bookmark_path: PathBuf,
    pub bookmark_count: Option<usize>,
    pub last_modified: Option<DateTime<Utc>>,
}

/// Chrome/Edge bookmark JSON structure
#[derive(Debug, Clone, Deserialize)]
pub struct ChromeBookmarks {
    pub roots: ChromeBookmarkRoots,
    pub version: Option<i32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChromeBookmarkRoots {
    pub bookmark_bar: ChromeBookmarkNode,
    pub other: ChromeBookmarkNode,
    pub synced: Option<ChromeBookmarkNode>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChromeBookmarkNode {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub node_type: String,
    pub url: Option<String>,
    pub children: Option<Vec<ChromeBookmarkNode>>,
}

impl ChromeBookmarkNode {
    /// Convert to a native node; unknown node types are dropped
    fn to_native(&self) -> Option<NativeBookmarkNode> {
        match self.node_type.as_str() {
            "url" => self
                .url
                .as_ref()
                .map(|url| NativeBookmarkNode::link(self.name.clone(), url.clone())),
            "folder" => Some(NativeBookmarkNode::folder(
                self.name.clone(),
                self.children
                    .iter()
                    .flatten()
                    .filter_map(ChromeBookmarkNode::to_native)
                    .collect(),
            )),
            _ => None,
        }
    }
}

impl ChromeBookmarks {
    /// Top-level folders, one per non-empty root
    pub fn into_native(self) -> Vec<NativeBookmarkNode> {
        let roots = [
            ("Bookmarks Bar", Some(self.roots.bookmark_bar)),
            ("Other Bookmarks", Some(self.roots.other)),
            ("Synced Bookmarks", self.roots.synced),
        ];

        roots
            .into_iter()
            .filter_map(|(label, node)| {
                let mut native = node?.to_native()?;
                if native.children.is_empty() {
                    return None;
                }
                if native.title.trim().is_empty() {
                    native.title = label.to_string();
                }
                Some(native)
            })
            .collect()
    }
}

/// Parse the contents of a Chromium `Bookmarks` file
pub fn parse_chrome_bookmarks(content: &str) -> Result<Vec<NativeBookmarkNode>, ImportError> {
    let bookmarks: ChromeBookmarks = serde_json::from_str(content)?;
    Ok(bookmarks.into_native())
}

/// Reads bookmarks from a Chromium profile's `Bookmarks` file
#[derive(Debug, Clone)]
pub struct ChromiumBookmarkProvider {
    browser: ChromiumBrowser,
    path: PathBuf,
}

impl ChromiumBookmarkProvider {
    pub fn new(browser: ChromiumBrowser, path: impl Into<PathBuf>) -> Self {
        Self {
            browser,
            path: path.into(),
        }
    }

    /// Provider for the browser's default profile, if its file exists
    pub fn default_profile(browser: ChromiumBrowser) -> Result<Self, ImportError> {
        browser
            .default_bookmark_path()
            .filter(|p| p.exists())
            .map(|p| Self::new(browser, p))
            .ok_or_else(|| ImportError::SourceNotFound {
                browser: browser.to_string(),
            })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Summary of the file for an import picker; unreadable details are `None`
    pub async fn describe(&self) -> BookmarkSource {
        let last_modified = tokio::fs::metadata(&self.path)
            .await
            .ok()
            .and_then(|m| m.modified().ok())
            .map(DateTime::<Utc>::from);

        let bookmark_count = self
            .read_tree()
            .await
            .ok()
            .map(|nodes| nodes.iter().map(NativeBookmarkNode::link_count).sum());

        BookmarkSource {
            browser: self.browser,
            bookmark_path: self.path.clone(),
            bookmark_count,
            last_modified,
        }
    }
}

impl From<&BookmarkSource> for ChromiumBookmarkProvider {
    fn from(source: &BookmarkSource) -> Self {
        Self::new(source.browser, source.bookmark_path.clone())
    }
}

#[async_trait]
impl NativeBookmarkProvider for ChromiumBookmarkProvider {
    fn name(&self) -> String {
        self.browser.to_string()
    }

    async fn read_tree(&self) -> Result<Vec<NativeBookmarkNode>, ImportError> {
        let content = tokio::fs::read_to_string(&self.path).await?;
        let nodes = parse_chrome_bookmarks(&content)?;
        debug!(
            "Read {} bookmarks from {}",
            nodes.iter().map(NativeBookmarkNode::link_count).sum::<usize>(),
            self.path.display()
        );
        Ok(nodes)
    }
}

/// Detect importable bookmark files from installed browsers
pub async fn detect_bookmark_sources() -> Vec<BookmarkSource> {
    let mut sources = Vec::new();

    for browser in ChromiumBrowser::all() {
        let Ok(provider) = ChromiumBookmarkProvider::default_profile(browser) else {
            continue;
        };
        sources.push(provider.describe().await);
    }

    info!("Detected {} bookmark sources", sources.len());
    sources
}

/// Flatten a native tree into local-only records.
///
/// Top-level nodes are placed under `parent_id` starting at `first_order`;
/// nested nodes keep their position within their own folder. Every record
/// gets a fresh UUID.
pub fn flatten_native_tree(
    nodes: &[NativeBookmarkNode],
    parent_id: Option<&str>,
    first_order: u32,
) -> Vec<BookmarkRecord> {
    let mut records = Vec::new();
    flatten_into(nodes, parent_id, first_order, &mut records);
    records
}

fn flatten_into(
    nodes: &[NativeBookmarkNode],
    parent_id: Option<&str>,
    first_order: u32,
    records: &mut Vec<BookmarkRecord>,
) {
    let mut order = first_order;
    for node in nodes {
        let title = match node.title.trim() {
            "" => node.url.clone().unwrap_or_else(|| UNTITLED.to_string()),
            title => title.to_string(),
        };

        match &node.url {
            Some(url) if url.trim().is_empty() => continue,
            Some(url) => {
                records.push(BookmarkRecord::new_local(
                    BookmarkType::Bookmark,
                    title,
                    Some(url.trim().to_string()),
                    parent_id.map(str::to_string),
                    order,
                ));
            }
            None => {
                let folder = BookmarkRecord::new_local(
                    BookmarkType::Folder,
                    title,
                    None,
                    parent_id.map(str::to_string),
                    order,
                );
                let folder_key = folder.key().to_string();
                records.push(folder);
                flatten_into(&node.children, Some(&folder_key), 0, records);
            }
        }
        order += 1;
    }
}
