//! Reconciliation Engine
//!
//! Merges a freshly fetched server snapshot with the previous local list.
//! The server is authoritative for every record it returns. Local-only
//! records it has never seen survive until the server confirms them, at
//! which point the server copy replaces them.

use bookmark_sync_core::*;
use std::collections::HashSet;
use tracing::debug;

/// Result of merging one server snapshot
#[derive(Debug, Clone, PartialEq)]
pub struct Reconciliation {
    /// The new flat list
    pub records: Vec<BookmarkRecord>,
    /// Records taken from the server snapshot
    pub from_server: usize,
    /// Local-only records kept because the server does not know them yet
    pub local_survivors: usize,
    /// Local-only records dropped because the server now has them
    pub confirmed: usize,
}

/// Merge `snapshot` into `previous`.
///
/// Callers only invoke this with a successful, non-empty fetch: an empty
/// snapshot would otherwise read as "the server has nothing".
pub fn reconcile(previous: &[BookmarkRecord], snapshot: Vec<ServerBookmark>) -> Reconciliation {
    let mut records: Vec<BookmarkRecord> = snapshot.into_iter().map(BookmarkRecord::from).collect();
    let from_server = records.len();

    let known: HashSet<String> = records
        .iter()
        .flat_map(|r| r.identity.ids().map(str::to_string))
        .collect();

    let local_only: Vec<&BookmarkRecord> = previous
        .iter()
        .filter(|r| r.classify() == SyncState::LocalOnly)
        .collect();

    let survivors: Vec<BookmarkRecord> = local_only
        .iter()
        .filter(|r| !r.identity.ids().any(|id| known.contains(id)))
        .map(|r| (*r).clone())
        .collect();

    let local_survivors = survivors.len();
    let confirmed = local_only.len() - local_survivors;
    records.extend(survivors);

    debug!(
        "Reconciled {} server records, kept {} local-only, {} newly confirmed",
        from_server, local_survivors, confirmed
    );

    Reconciliation {
        records,
        from_server,
        local_survivors,
        confirmed,
    }
}
