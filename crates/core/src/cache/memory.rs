//! In-memory cache store.
//!
//! Uses a simple map of maps behind a tokio RwLock. Nothing survives the
//! process; hosts that need persistence use [`CacheDb`](super::CacheDb).

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::storage::CacheStorage;
use crate::Error;
use crate::request::ResponseSnapshot;

#[derive(Default)]
struct Inner {
    /// Cache names in creation order.
    order: Vec<String>,
    caches: HashMap<String, HashMap<String, ResponseSnapshot>>,
}

impl Inner {
    fn ensure(&mut self, cache: &str) -> &mut HashMap<String, ResponseSnapshot> {
        if !self.caches.contains_key(cache) {
            self.order.push(cache.to_string());
        }
        self.caches.entry(cache.to_string()).or_default()
    }
}

/// Process-local [`CacheStorage`].
#[derive(Default)]
pub struct MemoryStorage {
    inner: RwLock<Inner>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries in `cache` (0 when the cache does not exist).
    pub async fn len(&self, cache: &str) -> usize {
        self.inner.read().await.caches.get(cache).map_or(0, HashMap::len)
    }
}

#[async_trait]
impl CacheStorage for MemoryStorage {
    async fn open(&self, cache: &str) -> Result<(), Error> {
        self.inner.write().await.ensure(cache);
        Ok(())
    }

    async fn match_request(&self, cache: &str, key: &str) -> Result<Option<ResponseSnapshot>, Error> {
        let inner = self.inner.read().await;
        Ok(inner.caches.get(cache).and_then(|entries| entries.get(key)).cloned())
    }

    async fn put(&self, cache: &str, key: &str, response: &ResponseSnapshot) -> Result<(), Error> {
        self.inner
            .write()
            .await
            .ensure(cache)
            .insert(key.to_string(), response.clone());
        Ok(())
    }

    async fn put_all(&self, cache: &str, entries: &[(String, ResponseSnapshot)]) -> Result<(), Error> {
        let mut inner = self.inner.write().await;
        let target = inner.ensure(cache);
        for (key, response) in entries {
            target.insert(key.clone(), response.clone());
        }
        Ok(())
    }

    async fn keys(&self) -> Result<Vec<String>, Error> {
        Ok(self.inner.read().await.order.clone())
    }

    async fn delete(&self, cache: &str) -> Result<bool, Error> {
        let mut inner = self.inner.write().await;
        let existed = inner.caches.remove(cache).is_some();
        inner.order.retain(|name| name != cache);
        Ok(existed)
    }
}
