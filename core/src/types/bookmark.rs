//! Bookmark records as held in the local cache.

use serde::{Deserialize, Serialize};

use crate::errors::ValidationError;
use crate::types::identity::{Identity, SyncState};

/// Kind of bookmark node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookmarkType {
    Bookmark,
    Folder,
}

/// Presentation-only fields, carried through merges untouched
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Presentation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sticker: Option<String>,
}

/// A bookmark or folder in the flat local list.
///
/// Serialized as the flat `{ id, onlineId, type, parentId, ... }` object the
/// cache has always stored; see [`Identity`] for how the two ids are read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "BookmarkRecordWire", into = "BookmarkRecordWire")]
pub struct BookmarkRecord {
    pub identity: Identity,
    pub kind: BookmarkType,
    pub parent_id: Option<String>,
    pub title: String,
    pub url: Option<String>,
    pub order: u32,
    pub is_local: bool,
    pub is_manageable: bool,
    pub presentation: Presentation,
}

impl BookmarkRecord {
    /// A brand-new local-only record with a fresh UUID
    pub fn new_local(
        kind: BookmarkType,
        title: impl Into<String>,
        url: Option<String>,
        parent_id: Option<String>,
        order: u32,
    ) -> Self {
        Self {
            identity: Identity::new_local(),
            kind,
            parent_id,
            title: title.into(),
            url,
            order,
            is_local: true,
            is_manageable: true,
            presentation: Presentation::default(),
        }
    }

    pub fn key(&self) -> &str {
        self.identity.key()
    }

    pub fn online_id(&self) -> Option<&str> {
        self.identity.server_id()
    }

    pub fn classify(&self) -> SyncState {
        self.identity.classify()
    }

    /// The id to use against server endpoints, if there is one
    pub fn resolve_server_id(&self) -> Option<&str> {
        self.identity.server_id()
    }

    pub fn is_folder(&self) -> bool {
        self.kind == BookmarkType::Folder
    }

    pub fn answers_to(&self, id: &str) -> bool {
        self.identity.answers_to(id)
    }
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BookmarkRecordWire {
    id: String,
    #[serde(default)]
    online_id: Option<String>,
    #[serde(rename = "type")]
    kind: BookmarkType,
    #[serde(default)]
    parent_id: Option<String>,
    title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    url: Option<String>,
    #[serde(default)]
    order: u32,
    #[serde(default)]
    is_local: bool,
    #[serde(default = "default_manageable")]
    is_manageable: bool,
    #[serde(flatten)]
    presentation: Presentation,
}

pub(crate) fn default_manageable() -> bool {
    true
}

impl From<BookmarkRecordWire> for BookmarkRecord {
    fn from(wire: BookmarkRecordWire) -> Self {
        Self {
            identity: Identity::from_parts(wire.id, wire.online_id),
            kind: wire.kind,
            parent_id: wire.parent_id,
            title: wire.title,
            url: wire.url,
            order: wire.order,
            is_local: wire.is_local,
            is_manageable: wire.is_manageable,
            presentation: wire.presentation,
        }
    }
}

impl From<BookmarkRecord> for BookmarkRecordWire {
    fn from(record: BookmarkRecord) -> Self {
        let (id, online_id) = record.identity.to_parts();
        Self {
            id,
            online_id,
            kind: record.kind,
            parent_id: record.parent_id,
            title: record.title,
            url: record.url,
            order: record.order,
            is_local: record.is_local,
            is_manageable: record.is_manageable,
            presentation: record.presentation,
        }
    }
}

/// Input for creating a bookmark or folder
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewBookmark {
    pub title: String,
    #[serde(rename = "type")]
    pub kind: BookmarkType,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub parent_id: Option<String>,
    #[serde(flatten)]
    pub presentation: Presentation,
}

impl NewBookmark {
    pub fn bookmark(title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            kind: BookmarkType::Bookmark,
            url: Some(url.into()),
            parent_id: None,
            presentation: Presentation::default(),
        }
    }

    pub fn folder(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            kind: BookmarkType::Folder,
            url: None,
            parent_id: None,
            presentation: Presentation::default(),
        }
    }

    pub fn in_folder(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    /// Trims the title and url in place, then checks the field rules
    pub fn validate(&mut self) -> Result<(), ValidationError> {
        self.title = self.title.trim().to_string();
        self.url = self.url.take().map(|u| u.trim().to_string()).filter(|u| !u.is_empty());
        validate_fields(self.kind, &self.title, self.url.as_deref())
    }
}

/// Partial update applied by an edit
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookmarkPatch {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub presentation: Option<Presentation>,
}

impl BookmarkPatch {
    pub fn title(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Self::default()
        }
    }

    /// Applies the patch to a copy of `record`, validating the result
    pub fn apply_to(&self, record: &BookmarkRecord) -> Result<BookmarkRecord, ValidationError> {
        let mut updated = record.clone();
        if let Some(title) = &self.title {
            updated.title = title.trim().to_string();
        }
        if let Some(url) = &self.url {
            let url = url.trim();
            updated.url = if url.is_empty() { None } else { Some(url.to_string()) };
        }
        if let Some(presentation) = &self.presentation {
            updated.presentation = presentation.clone();
        }
        validate_fields(updated.kind, &updated.title, updated.url.as_deref())?;
        Ok(updated)
    }
}

fn validate_fields(kind: BookmarkType, title: &str, url: Option<&str>) -> Result<(), ValidationError> {
    if title.trim().is_empty() {
        return Err(ValidationError::EmptyTitle);
    }
    match (kind, url) {
        (BookmarkType::Bookmark, None) => Err(ValidationError::MissingUrl),
        (BookmarkType::Folder, Some(_)) => Err(ValidationError::UrlNotAllowed),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_record_serializes_to_flat_cache_shape() {
        let record = BookmarkRecord {
            identity: Identity::from_server("srv1", Some("u1".to_string())),
            kind: BookmarkType::Bookmark,
            parent_id: None,
            title: "A".to_string(),
            url: Some("https://example.com".to_string()),
            order: 0,
            is_local: true,
            is_manageable: true,
            presentation: Presentation {
                icon: Some("star".to_string()),
                ..Presentation::default()
            },
        };

        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["id"], "u1");
        assert_eq!(value["onlineId"], "srv1");
        assert_eq!(value["type"], "BOOKMARK");
        assert_eq!(value["icon"], "star");
        assert!(value.get("textColor").is_none());

        let back: BookmarkRecord = serde_json::from_value(value).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn test_record_defaults_missing_fields() {
        let record: BookmarkRecord = serde_json::from_value(json!({
            "id": "srv9",
            "type": "FOLDER",
            "title": "Work"
        }))
        .unwrap();

        assert_eq!(record.order, 0);
        assert!(record.is_manageable);
        assert!(record.parent_id.is_none());
        assert_eq!(record.online_id(), Some("srv9"));
    }

    #[test]
    fn test_new_bookmark_validation() {
        let mut empty = NewBookmark::bookmark("   ", "https://example.com");
        assert_eq!(empty.validate(), Err(ValidationError::EmptyTitle));

        let mut no_url = NewBookmark::bookmark("Docs", "  ");
        assert_eq!(no_url.validate(), Err(ValidationError::MissingUrl));

        let mut folder = NewBookmark::folder("Work");
        folder.url = Some("https://example.com".to_string());
        assert_eq!(folder.validate(), Err(ValidationError::UrlNotAllowed));

        let mut ok = NewBookmark::bookmark("  Docs ", " https://docs.rs ");
        assert!(ok.validate().is_ok());
        assert_eq!(ok.title, "Docs");
        assert_eq!(ok.url.as_deref(), Some("https://docs.rs"));
    }

    #[test]
    fn test_patch_rejects_clearing_bookmark_url() {
        let record = BookmarkRecord::new_local(
            BookmarkType::Bookmark,
            "Docs",
            Some("https://docs.rs".to_string()),
            None,
            0,
        );
        let patch = BookmarkPatch {
            url: Some(String::new()),
            ..BookmarkPatch::default()
        };
        assert_eq!(patch.apply_to(&record), Err(ValidationError::MissingUrl));

        let renamed = BookmarkPatch::title(" Rust docs ").apply_to(&record).unwrap();
        assert_eq!(renamed.title, "Rust docs");
        assert_eq!(renamed.identity, record.identity);
    }
}
