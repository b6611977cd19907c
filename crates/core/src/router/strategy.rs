//! Cache-first and stale-while-revalidate.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::tasks::BackgroundTasks;
use crate::Error;
use crate::cache::NamedCache;
use crate::fetch::Fetcher;
use crate::request::{RequestDescriptor, ResponseSnapshot};

/// Where a served response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseSource {
    Cache,
    Network,
}

/// A response plus its provenance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Served {
    pub response: ResponseSnapshot,
    pub source: ResponseSource,
}

impl Served {
    fn cache(response: ResponseSnapshot) -> Self {
        Self { response, source: ResponseSource::Cache }
    }

    fn network(response: ResponseSnapshot) -> Self {
        Self { response, source: ResponseSource::Network }
    }
}

/// One strategy invocation: the cache to use, the request and its key.
pub(crate) struct StrategyCall<'a> {
    pub cache: NamedCache,
    pub key: String,
    pub request: &'a RequestDescriptor,
    pub fetcher: &'a Arc<dyn Fetcher>,
    pub tasks: &'a BackgroundTasks,
}

/// Look up, logging and swallowing read errors as misses.
async fn lookup(cache: &NamedCache, key: &str) -> Option<ResponseSnapshot> {
    match cache.match_request(key).await {
        Ok(hit) => hit,
        Err(e) => {
            tracing::warn!(cache = cache.name(), key, error = %e, "cache read failed, treating as miss");
            None
        }
    }
}

/// Write `response` under `key` without blocking the caller. Failures are
/// logged and otherwise ignored.
fn store_detached(tasks: &BackgroundTasks, cache: NamedCache, key: String, response: ResponseSnapshot) {
    tasks.spawn(async move {
        match cache.put(&key, &response).await {
            Ok(()) => tracing::debug!(cache = cache.name(), key = %key, status = response.status, "cache updated"),
            Err(e) => tracing::warn!(cache = cache.name(), key = %key, error = %e, "cache write failed"),
        }
    });
}

/// Serve from cache when present; otherwise fetch, store a copy in the
/// background and return the network response.
///
/// A network failure with nothing cached propagates to the caller.
pub(crate) async fn cache_first(call: StrategyCall<'_>) -> Result<Served, Error> {
    let StrategyCall { cache, key, request, fetcher, tasks } = call;

    if let Some(hit) = lookup(&cache, &key).await {
        tracing::debug!(cache = cache.name(), key = %key, "cache-first hit");
        return Ok(Served::cache(hit));
    }

    let response = fetcher.fetch(request).await?;
    tracing::debug!(cache = cache.name(), key = %key, status = response.status, "cache-first miss, fetched");
    store_detached(tasks, cache, key, response.clone());
    Ok(Served::network(response))
}

/// Serve the cached entry immediately while refreshing it from the network.
///
/// The fetch starts before the lookup resolves. An ok response replaces the
/// entry in the background. With nothing cached the caller waits for the
/// fetch; a failed fetch then propagates.
pub(crate) async fn stale_while_revalidate(call: StrategyCall<'_>) -> Result<Served, Error> {
    let StrategyCall { cache, key, request, fetcher, tasks } = call;

    let revalidation = {
        let fetcher = Arc::clone(fetcher);
        let request = request.clone();
        let cache = cache.clone();
        let key = key.clone();
        let store_tasks = tasks.clone();
        tasks.spawn(async move {
            let result = fetcher.fetch(&request).await;
            match &result {
                Ok(response) if response.is_ok() => store_detached(&store_tasks, cache, key, response.clone()),
                Ok(response) => {
                    tracing::debug!(cache = cache.name(), key = %key, status = response.status, "revalidation not stored")
                }
                Err(e) => tracing::debug!(cache = cache.name(), key = %key, error = %e, "revalidation failed"),
            }
            result
        })
    };

    if let Some(hit) = lookup(&cache, &key).await {
        tracing::debug!(cache = cache.name(), key = %key, "serving cached entry, revalidating");
        return Ok(Served::cache(hit));
    }

    let response = revalidation
        .await
        .map_err(|e| Error::Network(format!("revalidation task failed: {e}")))??;
    tracing::debug!(cache = cache.name(), key = %key, status = response.status, "no cached entry, served network");
    Ok(Served::network(response))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CacheStorage, MemoryStorage};
    use crate::router::testing::FakeFetcher;
    use url::Url;

    struct Fixture {
        storage: Arc<MemoryStorage>,
        fake: Arc<FakeFetcher>,
        fetcher: Arc<dyn Fetcher>,
        tasks: BackgroundTasks,
    }

    impl Fixture {
        fn new(fake: FakeFetcher) -> Self {
            let fake = Arc::new(fake);
            Self {
                storage: Arc::new(MemoryStorage::new()),
                fetcher: fake.clone(),
                fake,
                tasks: BackgroundTasks::new(),
            }
        }

        async fn cache(&self, name: &str) -> NamedCache {
            NamedCache::open(self.storage.clone(), name).await.unwrap()
        }
    }

    fn request(path: &str) -> RequestDescriptor {
        RequestDescriptor::get(Url::parse(&format!("https://loja.example{path}")).unwrap())
    }

    #[tokio::test]
    async fn test_cache_first_stores_any_status() {
        let fx = Fixture::new(FakeFetcher::new());
        fx.fake.respond("/static/missing.css", 404, "not found");
        let req = request("/static/missing.css");

        let served = cache_first(StrategyCall {
            cache: fx.cache("static").await,
            key: "/static/missing.css".into(),
            request: &req,
            fetcher: &fx.fetcher,
            tasks: &fx.tasks,
        })
        .await
        .unwrap();
        fx.tasks.settle().await;

        assert_eq!(served.response.status, 404);
        let stored = fx.storage.match_request("static", "/static/missing.css").await.unwrap();
        assert_eq!(stored.map(|r| r.status), Some(404));
    }

    #[tokio::test]
    async fn test_cache_first_network_failure_propagates() {
        let fx = Fixture::new(FakeFetcher::new());
        fx.fake.fail("/static/app.js");
        let req = request("/static/app.js");

        let result = cache_first(StrategyCall {
            cache: fx.cache("static").await,
            key: "/static/app.js".into(),
            request: &req,
            fetcher: &fx.fetcher,
            tasks: &fx.tasks,
        })
        .await;

        assert!(matches!(result, Err(Error::Network(_))));
    }

    #[tokio::test]
    async fn test_swr_does_not_store_error_status() {
        let fx = Fixture::new(FakeFetcher::new());
        fx.fake.respond("/media/gone.jpg", 500, "boom");
        let req = request("/media/gone.jpg");

        let served = stale_while_revalidate(StrategyCall {
            cache: fx.cache("img").await,
            key: "/media/gone.jpg".into(),
            request: &req,
            fetcher: &fx.fetcher,
            tasks: &fx.tasks,
        })
        .await
        .unwrap();
        fx.tasks.settle().await;

        assert_eq!(served.source, ResponseSource::Network);
        assert_eq!(served.response.status, 500);
        assert!(fx.storage.match_request("img", "/media/gone.jpg").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_swr_failed_revalidation_keeps_entry() {
        let fx = Fixture::new(FakeFetcher::new());
        fx.fake.fail("/media/a.jpg");
        let cached = ResponseSnapshot::new("https://loja.example/media/a.jpg", 200, "old");
        fx.storage.put("img", "/media/a.jpg", &cached).await.unwrap();
        let req = request("/media/a.jpg");

        let served = stale_while_revalidate(StrategyCall {
            cache: fx.cache("img").await,
            key: "/media/a.jpg".into(),
            request: &req,
            fetcher: &fx.fetcher,
            tasks: &fx.tasks,
        })
        .await
        .unwrap();
        fx.tasks.settle().await;

        assert_eq!(served, Served::cache(cached.clone()));
        assert_eq!(fx.storage.match_request("img", "/media/a.jpg").await.unwrap(), Some(cached));
        assert_eq!(fx.fake.calls_for("/media/a.jpg"), 1);
    }

    #[tokio::test]
    async fn test_swr_error_status_revalidation_keeps_entry() {
        let fx = Fixture::new(FakeFetcher::new());
        fx.fake.respond("/media/b.jpg", 503, "maintenance");
        let cached = ResponseSnapshot::new("https://loja.example/media/b.jpg", 200, "old");
        fx.storage.put("img", "/media/b.jpg", &cached).await.unwrap();
        let req = request("/media/b.jpg");

        let served = stale_while_revalidate(StrategyCall {
            cache: fx.cache("img").await,
            key: "/media/b.jpg".into(),
            request: &req,
            fetcher: &fx.fetcher,
            tasks: &fx.tasks,
        })
        .await
        .unwrap();
        fx.tasks.settle().await;

        assert_eq!(served, Served::cache(cached.clone()));
        assert_eq!(fx.fake.calls_for("/media/b.jpg"), 1);
        let stored = fx.storage.match_request("img", "/media/b.jpg").await.unwrap();
        assert_eq!(stored, Some(cached));
    }
}
