//! The cache store seam and the named-cache handle built on it.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::Error;
use crate::request::ResponseSnapshot;

/// A registry of named caches, each mapping request keys to responses.
///
/// Keys are the request identity produced by
/// [`RequestDescriptor::cache_key`](crate::RequestDescriptor::cache_key).
/// Implementations guarantee per-entry atomicity only; concurrent writers to
/// one key race and the last write wins.
#[async_trait]
pub trait CacheStorage: Send + Sync {
    /// Create the named cache if it does not exist yet.
    async fn open(&self, cache: &str) -> Result<(), Error>;

    /// Look up a stored response.
    async fn match_request(&self, cache: &str, key: &str) -> Result<Option<ResponseSnapshot>, Error>;

    /// Store a response, replacing any previous entry for `key`.
    ///
    /// Opens the cache implicitly.
    async fn put(&self, cache: &str, key: &str, response: &ResponseSnapshot) -> Result<(), Error>;

    /// Store several responses as one unit: either all land or none do.
    async fn put_all(&self, cache: &str, entries: &[(String, ResponseSnapshot)]) -> Result<(), Error>;

    /// Names of every existing cache, in creation order.
    async fn keys(&self) -> Result<Vec<String>, Error>;

    /// Delete a cache and all of its entries. Returns whether it existed.
    async fn delete(&self, cache: &str) -> Result<bool, Error>;
}

/// Handle to one named cache.
#[derive(Clone)]
pub struct NamedCache {
    storage: Arc<dyn CacheStorage>,
    name: String,
}

impl NamedCache {
    /// Open (creating lazily) the cache called `name`.
    pub async fn open(storage: Arc<dyn CacheStorage>, name: impl Into<String>) -> Result<Self, Error> {
        let name = name.into();
        storage.open(&name).await?;
        Ok(Self { storage, name })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub async fn match_request(&self, key: &str) -> Result<Option<ResponseSnapshot>, Error> {
        self.storage.match_request(&self.name, key).await
    }

    pub async fn put(&self, key: &str, response: &ResponseSnapshot) -> Result<(), Error> {
        self.storage.put(&self.name, key, response).await
    }

    pub async fn put_all(&self, entries: &[(String, ResponseSnapshot)]) -> Result<(), Error> {
        self.storage.put_all(&self.name, entries).await
    }
}

impl fmt::Debug for NamedCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NamedCache").field("name", &self.name).finish()
    }
}
