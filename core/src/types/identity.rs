//! Bookmark identity across the local (UUID) and server id spaces.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Returns true when `id` is a client-generated UUID.
pub fn is_local_id(id: &str) -> bool {
    Uuid::parse_str(id).is_ok()
}

/// Synchronisation state of a single record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SyncState {
    /// Never confirmed by the server
    LocalOnly,
    /// Known to the server under some server id
    Synced,
}

/// Which id spaces a record is known under.
///
/// The persisted form is the `{ id, onlineId }` pair; `Identity` is what the
/// rest of the code matches on.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Identity {
    /// Created on this client and not yet confirmed by the server
    Local { local_id: String },
    /// Originated on the server; the server id doubles as the UI key
    Synced { server_id: String },
    /// Created locally, later confirmed; the local id stays the UI key
    LocalSyncedTo { local_id: String, server_id: String },
}

impl Identity {
    /// Fresh identity for a record created on this client
    pub fn new_local() -> Self {
        Identity::Local {
            local_id: Uuid::new_v4().to_string(),
        }
    }

    /// Identity of a record as handed out by the server.
    ///
    /// `offline_id` is the local UUID the server record corresponds to, if the
    /// record was first created offline.
    pub fn from_server(server_id: impl Into<String>, offline_id: Option<String>) -> Self {
        let server_id = server_id.into();
        match offline_id {
            Some(local_id) if local_id != server_id => Identity::LocalSyncedTo { local_id, server_id },
            _ => Identity::Synced { server_id },
        }
    }

    /// Rebuild an identity from its persisted `{ id, onlineId }` pair
    pub fn from_parts(id: impl Into<String>, online_id: Option<String>) -> Self {
        let id = id.into();
        match online_id {
            None if is_local_id(&id) => Identity::Local { local_id: id },
            None => Identity::Synced { server_id: id },
            Some(server_id) if server_id == id => Identity::Synced { server_id },
            Some(server_id) => Identity::LocalSyncedTo { local_id: id, server_id },
        }
    }

    /// The stable key used by the UI (`id` in the persisted form)
    pub fn key(&self) -> &str {
        match self {
            Identity::Local { local_id } => local_id,
            Identity::Synced { server_id } => server_id,
            Identity::LocalSyncedTo { local_id, .. } => local_id,
        }
    }

    /// The server id, if the server has ever confirmed this record
    pub fn server_id(&self) -> Option<&str> {
        match self {
            Identity::Local { .. } => None,
            Identity::Synced { server_id } | Identity::LocalSyncedTo { server_id, .. } => {
                Some(server_id)
            }
        }
    }

    pub fn classify(&self) -> SyncState {
        match self {
            Identity::Local { .. } => SyncState::LocalOnly,
            Identity::Synced { .. } | Identity::LocalSyncedTo { .. } => SyncState::Synced,
        }
    }

    /// True if `id` names this record in either id space
    pub fn answers_to(&self, id: &str) -> bool {
        self.key() == id || self.server_id() == Some(id)
    }

    /// Two identities are the same bookmark when any of their ids coincide
    pub fn matches(&self, other: &Identity) -> bool {
        self.answers_to(other.key()) || other.server_id().map_or(false, |s| self.answers_to(s))
    }

    /// Every id this record is known under
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.key()).chain(self.server_id().filter(|s| *s != self.key()))
    }

    /// Split back into the persisted `{ id, onlineId }` pair
    pub fn to_parts(&self) -> (String, Option<String>) {
        (self.key().to_string(), self.server_id().map(str::to_string))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_uuid_without_online_id_is_local_only() {
        let id = Uuid::new_v4().to_string();
        let identity = Identity::from_parts(id.clone(), None);
        assert_eq!(identity.classify(), SyncState::LocalOnly);
        assert_eq!(identity.server_id(), None);
        assert_eq!(identity.key(), id);
    }

    #[test]
    fn test_plain_server_id_is_synced() {
        let identity = Identity::from_parts("srv-42", None);
        assert_eq!(identity, Identity::Synced { server_id: "srv-42".to_string() });
        assert_eq!(identity.server_id(), Some("srv-42"));
        assert_eq!(identity.to_parts(), ("srv-42".to_string(), Some("srv-42".to_string())));
    }

    #[test]
    fn test_local_id_confirmed_by_server() {
        let local = Uuid::new_v4().to_string();
        let identity = Identity::from_parts(local.clone(), Some("srv1".to_string()));
        assert_eq!(identity.classify(), SyncState::Synced);
        assert_eq!(identity.key(), local);
        assert_eq!(identity.server_id(), Some("srv1"));
        assert_eq!(identity.ids().count(), 2);
    }

    #[test]
    fn test_from_server_keeps_offline_key() {
        let identity = Identity::from_server("srv1", Some("u1".to_string()));
        assert_eq!(identity.key(), "u1");
        assert_eq!(identity.server_id(), Some("srv1"));

        let plain = Identity::from_server("srv2", None);
        assert_eq!(plain.key(), "srv2");
        assert_eq!(plain.ids().count(), 1);
    }

    #[test]
    fn test_matches_on_either_id() {
        let local = Identity::Local { local_id: "u1".to_string() };
        let confirmed = Identity::from_server("srv1", Some("u1".to_string()));
        let other = Identity::Synced { server_id: "srv1".to_string() };

        assert!(local.matches(&confirmed));
        assert!(confirmed.matches(&local));
        assert!(confirmed.matches(&other));
        assert!(!local.matches(&other));
    }
}
