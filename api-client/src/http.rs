//! `reqwest` implementation of [`BookmarkApi`]

use crate::{ApiResult, BookmarkApi, TokenSession};
use async_trait::async_trait;
use bookmark_sync_core::*;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;
use url::Url;

const DEFAULT_TIMEOUT_SECS: u64 = 15;

/// HTTP client for the bookmark server
#[derive(Clone)]
pub struct HttpBookmarkApi {
    client: reqwest::Client,
    base_url: Url,
    session: TokenSession,
}

impl HttpBookmarkApi {
    /// Create a client rooted at `base_url` (e.g. `https://api.example.com/v1`)
    pub fn new(base_url: &str, session: TokenSession) -> ApiResult<Self> {
        Self::with_timeout(base_url, session, DEFAULT_TIMEOUT_SECS)
    }

    /// Create a client with a custom request timeout
    pub fn with_timeout(base_url: &str, session: TokenSession, timeout_secs: u64) -> ApiResult<Self> {
        let mut normalized = base_url.trim().to_string();
        if !normalized.ends_with('/') {
            normalized.push('/');
        }
        let base_url = Url::parse(&normalized).map_err(|e| ApiError::Network {
            details: format!("Invalid base URL '{}': {}", base_url, e),
        })?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Ok(Self {
            client,
            base_url,
            session,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn session(&self) -> &TokenSession {
        &self.session
    }

    fn endpoint(&self, path: &str) -> ApiResult<Url> {
        self.base_url.join(path).map_err(|e| ApiError::Network {
            details: format!("Invalid endpoint '{}': {}", path, e),
        })
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> ApiResult<reqwest::Response> {
        let request = match self.session.token().await {
            Some(token) => request.bearer_auth(token),
            None => request,
        };

        let response = request.send().await.map_err(network_error)?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let message = response.text().await.unwrap_or_default();
        Err(ApiError::Status {
            status: status.as_u16(),
            message,
        })
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> ApiResult<T> {
        response.json::<T>().await.map_err(|e| ApiError::Decode {
            details: e.to_string(),
        })
    }
}

fn network_error(e: reqwest::Error) -> ApiError {
    let details = if e.is_timeout() {
        "Request timed out".to_string()
    } else if e.is_connect() {
        "Connection failed".to_string()
    } else {
        e.to_string()
    };
    ApiError::Network { details }
}

#[async_trait]
impl BookmarkApi for HttpBookmarkApi {
    async fn fetch_bookmarks(&self) -> ApiResult<Vec<ServerBookmark>> {
        let url = self.endpoint("bookmarks")?;
        let response = self.send(self.client.get(url)).await?;
        let bookmarks: Vec<ServerBookmark> = Self::decode(response).await?;
        debug!("Fetched {} bookmarks from server", bookmarks.len());
        Ok(bookmarks)
    }

    async fn create_bookmark(&self, payload: &BookmarkPayload) -> ApiResult<ServerBookmark> {
        let url = self.endpoint("bookmarks")?;
        let response = self.send(self.client.post(url).json(payload)).await?;
        Self::decode(response).await
    }

    async fn update_bookmark(&self, server_id: &str, payload: &BookmarkPayload) -> ApiResult<ServerBookmark> {
        let url = self.endpoint(&format!("bookmarks/{}", server_id))?;
        let response = self.send(self.client.put(url).json(payload)).await?;
        Self::decode(response).await
    }

    async fn delete_bookmark(&self, server_id: &str) -> ApiResult<()> {
        let url = self.endpoint(&format!("bookmarks/{}", server_id))?;
        self.send(self.client.delete(url)).await?;
        Ok(())
    }

    async fn update_order(&self, order: &OrderPayload) -> ApiResult<()> {
        let url = self.endpoint("bookmarks/order")?;
        self.send(self.client.put(url).json(order)).await?;
        Ok(())
    }
}
