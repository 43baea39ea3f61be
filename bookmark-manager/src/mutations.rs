//! Mutation Operations
//!
//! Add, edit and delete go to the server first and then refresh from it;
//! nothing is written locally before the server confirms. Reorder is the
//! exception: it is applied and persisted locally at once and the new
//! folder order is queued for a deferred sync.

use crate::events::ChangeSource;
use crate::identity::IdentityResolver;
use crate::store::{pending_order_for, BookmarkStore};
use crate::tree;
use bookmark_sync_core::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Where a reordered record goes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ReorderTarget {
    /// New visual position among its current siblings
    Within { index: usize },
    /// Move to the top of another folder (`None` is the root)
    IntoFolder { folder_id: Option<String> },
}

impl BookmarkStore {
    /// Create a bookmark or folder at the end of its parent folder.
    ///
    /// Returns the record as known after the follow-up refresh.
    pub async fn add(&self, mut input: NewBookmark) -> Result<BookmarkRecord> {
        input.validate()?;

        let (parent_id, order) = {
            let records = self.records.read().await;
            let resolver = IdentityResolver::new(&records);
            if let Some(parent) = input.parent_id.as_deref() {
                let folder = resolver
                    .find(parent)
                    .ok_or_else(|| BookmarkSyncError::NotFound { id: parent.to_string() })?;
                if !folder.is_folder() {
                    return Err(ValidationError::NotAFolder { id: parent.to_string() }.into());
                }
            }
            (
                resolver.translate_parent(input.parent_id.as_deref()),
                tree::next_order(&records, input.parent_id.as_deref()),
            )
        };

        self.ensure_authenticated().await?;

        let payload = BookmarkPayload::for_new(&input, parent_id, order);
        let created = self.api.create_bookmark(&payload).await?;
        info!("Created {:?} {}", created.kind, created.id);

        self.refresh_after_mutation().await;
        let server_id = created.id.clone();
        Ok(self.get(&server_id).await.unwrap_or_else(|| created.into()))
    }

    /// Update title, url or presentation of a synced record
    pub async fn edit(&self, id: &str, patch: BookmarkPatch) -> Result<BookmarkRecord> {
        let (server_id, updated, parent_id) = {
            let records = self.records.read().await;
            let resolver = IdentityResolver::new(&records);
            let record = resolver
                .find(id)
                .ok_or_else(|| BookmarkSyncError::NotFound { id: id.to_string() })?;
            let server_id = synced_target(record)?;
            let updated = patch.apply_to(record)?;
            let parent_id = resolver.translate_parent(updated.parent_id.as_deref());
            (server_id, updated, parent_id)
        };

        self.ensure_authenticated().await?;

        let payload = BookmarkPayload::for_record(&updated, parent_id);
        self.api.update_bookmark(&server_id, &payload).await?;
        info!("Updated bookmark {}", server_id);

        self.refresh_after_mutation().await;
        Ok(self.get(updated.key()).await.unwrap_or(updated))
    }

    /// Delete a synced record. The server removes a folder's descendants
    /// along with it.
    ///
    /// Returns the number of records removed locally.
    pub async fn delete(&self, id: &str) -> Result<usize> {
        let (server_id, key) = {
            let records = self.records.read().await;
            let record = IdentityResolver::new(&records)
                .find(id)
                .ok_or_else(|| BookmarkSyncError::NotFound { id: id.to_string() })?;
            (synced_target(record)?, record.key().to_string())
        };

        self.ensure_authenticated().await?;

        self.api.delete_bookmark(&server_id).await?;
        info!("Deleted bookmark {}", server_id);

        // A refresh cannot drop the last records, so prune the subtree here
        let removed = {
            let mut records = self.records.write().await;
            self.ensure_loaded(&mut records).await?;
            let doomed = tree::subtree_keys(&records, &key);
            let remaining: Vec<BookmarkRecord> = records
                .iter()
                .filter(|r| !doomed.contains(r.key()))
                .cloned()
                .collect();
            let removed = records.len() - remaining.len();
            self.cache.save(&remaining).await?;
            *records = remaining;
            removed
        };
        let total = self.len().await;
        self.publish_changed(total, ChangeSource::LocalMutation);

        self.refresh_after_mutation().await;
        Ok(removed)
    }

    /// Move a record within its folder or into another folder.
    ///
    /// The change is persisted locally right away; the new folder order is
    /// queued and a deferred sync is scheduled. If the order cannot be
    /// queued the local move stays applied and the storage error is
    /// returned, since the server would otherwise never hear about it.
    pub async fn reorder(&self, id: &str, target: ReorderTarget) -> Result<()> {
        let (updated, folder) = {
            let mut records = self.records.write().await;
            self.ensure_loaded(&mut records).await?;
            let resolver = IdentityResolver::new(&records);
            let index = resolver
                .position(id)
                .ok_or_else(|| BookmarkSyncError::NotFound { id: id.to_string() })?;
            let record = &records[index];
            if !record.is_manageable {
                return Err(BookmarkSyncError::NotManageable { id: id.to_string() });
            }

            let target = match target {
                ReorderTarget::IntoFolder { folder_id } if same_folder(&resolver, record, folder_id.as_deref()) => {
                    ReorderTarget::Within { index: 0 }
                }
                other => other,
            };

            let mut updated = records.clone();
            let folder = match target {
                ReorderTarget::Within { index: target_index } => {
                    tree::move_within(&mut updated, index, target_index);
                    record.parent_id.clone()
                }
                ReorderTarget::IntoFolder { folder_id } => {
                    let parent_id = match folder_id.as_deref() {
                        None => None,
                        Some(folder_id) => {
                            let destination = resolver
                                .find(folder_id)
                                .ok_or_else(|| BookmarkSyncError::NotFound { id: folder_id.to_string() })?;
                            if !destination.is_folder() {
                                return Err(ValidationError::NotAFolder { id: folder_id.to_string() }.into());
                            }
                            if !destination.is_manageable {
                                return Err(BookmarkSyncError::NotManageable { id: folder_id.to_string() });
                            }
                            if tree::is_within(&records, folder_id, record) {
                                return Err(ValidationError::CyclicMove { id: id.to_string() }.into());
                            }
                            resolver.translate_parent(Some(folder_id))
                        }
                    };
                    // Destination siblings keep their order; ties resolve by list position
                    updated[index].parent_id = parent_id.clone();
                    updated[index].order = 0;
                    parent_id
                }
            };

            self.cache.save(&updated).await?;
            *records = updated.clone();
            (updated, folder)
        };

        debug!("Reordered {} in folder {}", id, FolderKey::for_parent(folder.as_deref()));
        self.publish_changed(updated.len(), ChangeSource::LocalMutation);

        match pending_order_for(&updated, folder.as_deref()) {
            Some(entry) => {
                if let Err(e) = self.order_queue.enqueue(entry).await {
                    warn!("Failed to queue order for folder {}: {}", FolderKey::for_parent(folder.as_deref()), e);
                    return Err(e);
                }
                self.request_sync();
            }
            None => debug!("Folder not synced yet, order stays local"),
        }
        Ok(())
    }

    async fn ensure_authenticated(&self) -> Result<()> {
        if self.session.is_authenticated().await {
            Ok(())
        } else {
            Err(BookmarkSyncError::AuthRequired)
        }
    }

    /// The mutation itself succeeded; a failed refresh only delays the
    /// server's copy until the next one
    async fn refresh_after_mutation(&self) {
        if let Err(e) = self.refresh().await {
            warn!("Refresh after mutation failed: {}", e);
        }
    }
}

/// Server id of a record that edit/delete may target
fn synced_target(record: &BookmarkRecord) -> Result<String> {
    if !record.is_manageable {
        return Err(BookmarkSyncError::NotManageable {
            id: record.key().to_string(),
        });
    }
    record
        .resolve_server_id()
        .map(str::to_string)
        .ok_or_else(|| BookmarkSyncError::NotYetSynced {
            id: record.key().to_string(),
        })
}

fn same_folder(resolver: &IdentityResolver<'_>, record: &BookmarkRecord, folder_id: Option<&str>) -> bool {
    match (record.parent_id.as_deref(), folder_id) {
        (None, None) => true,
        (Some(current), Some(target)) => resolver.aliases(current).contains(target),
        _ => false,
    }
}
