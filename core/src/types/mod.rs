//! Bookmark data model shared by every layer of the workspace.

pub mod identity;
pub mod bookmark;
pub mod order;
pub mod api;

pub use identity::*;
pub use bookmark::*;
pub use order::*;
pub use api::*;
