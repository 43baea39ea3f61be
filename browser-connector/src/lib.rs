//! Browser Connector module
//!
//! Reads the browser's own bookmark tree for a one-time, user-initiated
//! import into the bookmark store.
//!
//! # Features
//! - Detection of Chrome and Edge default-profile bookmark files
//! - Parsing of the Chromium `Bookmarks` JSON format
//! - Flattening of the native tree into local-only records

pub mod traits;
pub mod bookmark_import;

pub use traits::*;
pub use bookmark_import::{
    detect_bookmark_sources, flatten_native_tree, parse_chrome_bookmarks, BookmarkSource,
    ChromiumBookmarkProvider, ChromiumBrowser,
};
