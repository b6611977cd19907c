//! The cache router.
//!
//! Hosts drive it through [`LifecycleHandler`]:
//!
//! - `on_install`: precache the asset manifest into the static cache
//! - `on_activate`: delete caches from older generations
//! - `on_fetch`: classify a request and serve it cache-first or
//!   stale-while-revalidate, or hand it back for plain network handling
//!
//! Cache writes happen in detached tasks (see [`BackgroundTasks`]); call
//! [`CacheRouter::settle`] to wait for them.

pub mod classify;
pub mod lifecycle;
pub mod strategy;
pub mod tasks;

#[cfg(test)]
pub(crate) mod testing;

use std::sync::Arc;

use async_trait::async_trait;

pub use classify::{Classification, Strategy, classify};
pub use lifecycle::{ActivateReport, InstallReport};
pub use strategy::{ResponseSource, Served};
pub use tasks::BackgroundTasks;

use crate::Error;
use crate::cache::{CacheStorage, NamedCache};
use crate::config::RouterConfig;
use crate::fetch::Fetcher;
use crate::request::{RequestDescriptor, ResponseSnapshot};
use strategy::StrategyCall;

/// What the host should do with an intercepted request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// Answer the request with this response.
    Respond { response: ResponseSnapshot, classification: Classification, source: ResponseSource },
    /// Not ours; let the request go to the network untouched.
    Passthrough,
}

impl FetchOutcome {
    pub fn response(&self) -> Option<&ResponseSnapshot> {
        match self {
            Self::Respond { response, .. } => Some(response),
            Self::Passthrough => None,
        }
    }
}

/// The three host lifecycle events.
///
/// Each returned future settles when the event's own work is done, which is
/// when a host may run its default follow-up (finish installing, finish
/// activating, deliver the response). Detached cache writes may still be
/// running at that point.
#[async_trait]
pub trait LifecycleHandler: Send + Sync {
    async fn on_install(&self) -> Result<InstallReport, Error>;

    async fn on_activate(&self) -> Result<ActivateReport, Error>;

    async fn on_fetch(&self, request: &RequestDescriptor) -> Result<FetchOutcome, Error>;
}

/// Request-interception policy over a cache store and a network fetcher.
#[derive(Clone)]
pub struct CacheRouter {
    config: Arc<RouterConfig>,
    storage: Arc<dyn CacheStorage>,
    fetcher: Arc<dyn Fetcher>,
    tasks: BackgroundTasks,
}

impl CacheRouter {
    pub fn new(config: RouterConfig, storage: Arc<dyn CacheStorage>, fetcher: Arc<dyn Fetcher>) -> Self {
        Self { config: Arc::new(config), storage, fetcher, tasks: BackgroundTasks::new() }
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    pub fn storage(&self) -> &Arc<dyn CacheStorage> {
        &self.storage
    }

    /// Classify without serving.
    pub fn classify(&self, request: &RequestDescriptor) -> Classification {
        classify(&self.config, request)
    }

    /// Background tasks not yet finished.
    pub fn pending_tasks(&self) -> usize {
        self.tasks.pending()
    }

    /// Wait for every detached cache write and revalidation to finish.
    pub async fn settle(&self) {
        self.tasks.settle().await;
    }
}

#[async_trait]
impl LifecycleHandler for CacheRouter {
    async fn on_install(&self) -> Result<InstallReport, Error> {
        lifecycle::install(&self.config, &self.storage, &self.fetcher).await
    }

    async fn on_activate(&self) -> Result<ActivateReport, Error> {
        lifecycle::activate(&self.config, &self.storage).await
    }

    async fn on_fetch(&self, request: &RequestDescriptor) -> Result<FetchOutcome, Error> {
        let classification = self.classify(request);
        let (Some(strategy), Some(cache_name)) =
            (classification.strategy(), classification.cache_name(&self.config.caches))
        else {
            tracing::trace!(%request, "passthrough");
            return Ok(FetchOutcome::Passthrough);
        };

        let cache = NamedCache::open(Arc::clone(&self.storage), cache_name).await?;
        let call = StrategyCall {
            cache,
            key: request.cache_key(&self.config.origin),
            request,
            fetcher: &self.fetcher,
            tasks: &self.tasks,
        };

        let served = match strategy {
            Strategy::CacheFirst => strategy::cache_first(call).await,
            Strategy::StaleWhileRevalidate => strategy::stale_while_revalidate(call).await,
        }
        .inspect_err(|e| tracing::debug!(%request, ?classification, error = %e, "request failed"))?;

        Ok(FetchOutcome::Respond { response: served.response, classification, source: served.source })
    }
}
