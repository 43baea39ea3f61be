//! Bookmark Manager for the bookmark sync engine
//!
//! Keeps one consistent bookmark tree across the offline cache and the
//! bookmark server, whose records may be keyed by a client UUID, a server
//! id, or both.
//!
//! # Features
//! - Identity resolution across the local and server id spaces
//! - Folder tree queries with stable sibling ordering
//! - Reconciliation of server snapshots with offline-created records
//! - Add, edit, delete and local-first reorder
//! - Durable deferred queue for folder order changes
//! - Typed event bus and debounced sync trigger

pub mod identity;
pub mod tree;
pub mod reconcile;
pub mod events;
pub mod debounce;
pub mod order_queue;
pub mod store;
pub mod mutations;

pub use identity::IdentityResolver;
pub use reconcile::{reconcile, Reconciliation};
pub use events::{BookmarkEvent, ChangeSource, EventBus, Subscription, Topic};
pub use debounce::Debouncer;
pub use order_queue::{FlushReport, FlushStatus, OrderSyncQueue};
pub use store::{BookmarkStore, BookmarkStoreConfig, RefreshOutcome, DEFAULT_SYNC_DEBOUNCE};
pub use mutations::ReorderTarget;

// Re-export commonly used types
pub use bookmark_sync_core::*;
