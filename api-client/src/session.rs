//! Session state backed by a bearer token

use crate::SessionProvider;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Holds the bearer token shared between the HTTP client and the session check
#[derive(Debug, Clone, Default)]
pub struct TokenSession {
    token: Arc<RwLock<Option<String>>>,
}

impl TokenSession {
    pub fn new(token: Option<String>) -> Self {
        Self {
            token: Arc::new(RwLock::new(token.filter(|t| !t.is_empty()))),
        }
    }

    pub async fn sign_in(&self, token: impl Into<String>) {
        *self.token.write().await = Some(token.into());
    }

    pub async fn sign_out(&self) {
        *self.token.write().await = None;
    }

    pub async fn token(&self) -> Option<String> {
        self.token.read().await.clone()
    }
}

#[async_trait]
impl SessionProvider for TokenSession {
    async fn is_authenticated(&self) -> bool {
        self.token.read().await.is_some()
    }
}
