//! Contracts consumed by the bookmark store

use async_trait::async_trait;
use bookmark_sync_core::*;

pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// Remote bookmark endpoints
#[async_trait]
pub trait BookmarkApi: Send + Sync {
    /// `GET /bookmarks`
    async fn fetch_bookmarks(&self) -> ApiResult<Vec<ServerBookmark>>;

    /// `POST /bookmarks`
    async fn create_bookmark(&self, payload: &BookmarkPayload) -> ApiResult<ServerBookmark>;

    /// `PUT /bookmarks/:id`
    async fn update_bookmark(&self, server_id: &str, payload: &BookmarkPayload) -> ApiResult<ServerBookmark>;

    /// `DELETE /bookmarks/:id`; the server cascades to descendants of a folder
    async fn delete_bookmark(&self, server_id: &str) -> ApiResult<()>;

    /// `PUT /bookmarks/order`
    async fn update_order(&self, order: &OrderPayload) -> ApiResult<()>;
}

/// Whether the user currently has an authenticated session
#[async_trait]
pub trait SessionProvider: Send + Sync {
    async fn is_authenticated(&self) -> bool;
}
