//! Bookmark Identity Resolver
//!
//! Resolves references that may be either a local UUID or a server id
//! against the flat record list.

use bookmark_sync_core::*;
use std::collections::HashSet;

/// Lookup over a flat record list by either id space
pub struct IdentityResolver<'a> {
    records: &'a [BookmarkRecord],
}

impl<'a> IdentityResolver<'a> {
    pub fn new(records: &'a [BookmarkRecord]) -> Self {
        Self { records }
    }

    /// Index of the record `id` refers to. A UI key match wins over a
    /// server id match.
    pub fn position(&self, id: &str) -> Option<usize> {
        self.records
            .iter()
            .position(|r| r.key() == id)
            .or_else(|| self.records.iter().position(|r| r.online_id() == Some(id)))
    }

    pub fn find(&self, id: &str) -> Option<&'a BookmarkRecord> {
        self.position(id).map(|i| &self.records[i])
    }

    /// `None` when the reference is unknown to the list
    pub fn classify(&self, id: &str) -> Option<SyncState> {
        self.find(id).map(BookmarkRecord::classify)
    }

    /// Server id for a reference, if one is known.
    ///
    /// A reference that matches no record but is not a UUID is taken to be a
    /// server id already.
    pub fn server_id_for(&self, id: &str) -> Option<String> {
        match self.find(id) {
            Some(record) => record.resolve_server_id().map(str::to_string),
            None if !is_local_id(id) => Some(id.to_string()),
            None => None,
        }
    }

    /// Parent reference to send to the server: its server id when known,
    /// otherwise the reference unchanged
    pub fn translate_parent(&self, parent_id: Option<&str>) -> Option<String> {
        parent_id.map(|p| self.server_id_for(p).unwrap_or_else(|| p.to_string()))
    }

    /// Every id that refers to the same record as `id`, including `id`
    pub fn aliases(&self, id: &str) -> HashSet<String> {
        let mut aliases = HashSet::new();
        aliases.insert(id.to_string());
        for record in self.records.iter().filter(|r| r.answers_to(id)) {
            aliases.extend(record.identity.ids().map(str::to_string));
        }
        aliases
    }
}
