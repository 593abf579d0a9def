//! Bearer token storage
//!
//! The session context handed to the client at construction.
//! Set at login, cleared at logout or on any 401.

use crate::Result;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tokio::sync::RwLock;

pub mod file;
pub use file::FileTokenStore;

/// Trait for bearer token persistence
#[async_trait::async_trait]
pub trait TokenStore: Send + Sync {
    async fn get(&self) -> Result<Option<String>>;
    async fn set(&self, token: &str) -> Result<()>;
    /// Clearing an absent token is a no-op.
    async fn clear(&self) -> Result<()>;
}

/// In-memory token store for a single process
pub struct InMemoryTokenStore {
    token: Arc<RwLock<Option<String>>>,
}

impl InMemoryTokenStore {
    pub fn new() -> Self {
        Self {
            token: Arc::new(RwLock::new(None)),
        }
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: Arc::new(RwLock::new(Some(token.into()))),
        }
    }
}

impl Default for InMemoryTokenStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl TokenStore for InMemoryTokenStore {

    async fn get(&self) -> Result<Option<String>> {
        Ok(self.token.read().await.clone())
    }

    async fn set(&self, token: &str) -> Result<()> {
        let mut slot = self.token.write().await;
        *slot = Some(token.to_string());
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        self.token.write().await.take();
        Ok(())
    }
}

/// Short identifier for a token, safe to log.
pub fn fingerprint(token: &str) -> String {
    let hash = Sha256::digest(token.as_bytes());
    hex::encode(&hash[..4])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_lifecycle() {
        let store = InMemoryTokenStore::new();
        assert_eq!(store.get().await.unwrap(), None);

        store.set("abc").await.unwrap();
        assert_eq!(store.get().await.unwrap().as_deref(), Some("abc"));

        store.clear().await.unwrap();
        store.clear().await.unwrap();
        assert_eq!(store.get().await.unwrap(), None);
    }

    #[test]
    fn test_fingerprint_is_stable_and_short() {
        let a = fingerprint("token-one");
        assert_eq!(a.len(), 8);
        assert_eq!(a, fingerprint("token-one"));
        assert_ne!(a, fingerprint("token-two"));
    }
}
