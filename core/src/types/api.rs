//! Shapes exchanged with the bookmarks REST endpoints.

use serde::{Deserialize, Serialize};

use crate::types::bookmark::{default_manageable, BookmarkRecord, BookmarkType, NewBookmark, Presentation};
use crate::types::identity::Identity;

/// A bookmark as returned by `GET /bookmarks`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerBookmark {
    pub id: String,
    /// Local UUID this record was created under, when it was created offline
    #[serde(default)]
    pub offline_id: Option<String>,
    #[serde(rename = "type")]
    pub kind: BookmarkType,
    #[serde(default)]
    pub parent_id: Option<String>,
    pub title: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub order: u32,
    #[serde(default = "default_manageable")]
    pub is_manageable: bool,
    #[serde(flatten)]
    pub presentation: Presentation,
}

impl From<ServerBookmark> for BookmarkRecord {
    fn from(server: ServerBookmark) -> Self {
        Self {
            identity: Identity::from_server(server.id, server.offline_id),
            kind: server.kind,
            parent_id: server.parent_id,
            title: server.title,
            url: server.url,
            order: server.order,
            is_local: true,
            is_manageable: server.is_manageable,
            presentation: server.presentation,
        }
    }
}

/// Body of `POST /bookmarks` and `PUT /bookmarks/:id`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookmarkPayload {
    pub title: String,
    #[serde(rename = "type")]
    pub kind: BookmarkType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub parent_id: Option<String>,
    pub order: u32,
    #[serde(flatten)]
    pub presentation: Presentation,
}

impl BookmarkPayload {
    /// Payload for a new record; `parent_id` must already be a server id
    pub fn for_new(input: &NewBookmark, parent_id: Option<String>, order: u32) -> Self {
        Self {
            title: input.title.clone(),
            kind: input.kind,
            url: input.url.clone(),
            parent_id,
            order,
            presentation: input.presentation.clone(),
        }
    }

    /// Payload mirroring an existing record
    pub fn for_record(record: &BookmarkRecord, parent_id: Option<String>) -> Self {
        Self {
            title: record.title.clone(),
            kind: record.kind,
            url: record.url.clone(),
            parent_id,
            order: record.order,
            presentation: record.presentation.clone(),
        }
    }
}
