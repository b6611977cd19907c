//! Install-time precache and activation-time cache cutover.

use std::sync::Arc;

use futures_util::future::try_join_all;
use serde::{Deserialize, Serialize};

use crate::Error;
use crate::cache::{CacheStorage, NamedCache};
use crate::config::RouterConfig;
use crate::fetch::Fetcher;
use crate::request::RequestDescriptor;

/// Outcome of a successful install.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallReport {
    /// Cache the manifest was stored in.
    pub cache: String,
    /// Number of manifest entries stored.
    pub stored: usize,
    /// Whether the host should skip the waiting phase.
    pub skip_waiting: bool,
}

/// Outcome of an activation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivateReport {
    /// Caches removed because they are not in the allow-list.
    pub deleted: Vec<String>,
    /// Pre-existing caches that survived.
    pub retained: Vec<String>,
    /// Whether the host should take control of open pages now.
    pub claim_clients: bool,
}

/// Fetch every manifest URL and store all of them in the static cache.
///
/// All-or-nothing: one network failure or non-ok status fails the install
/// and nothing is written, leaving the previous generation in charge.
pub(crate) async fn install(
    config: &RouterConfig, storage: &Arc<dyn CacheStorage>, fetcher: &Arc<dyn Fetcher>,
) -> Result<InstallReport, Error> {
    let cache = NamedCache::open(Arc::clone(storage), config.caches.static_cache.clone()).await?;

    let requests = config
        .manifest
        .iter()
        .map(|raw| {
            config
                .origin
                .join(raw)
                .map(|url| (raw.as_str(), RequestDescriptor::get(url)))
                .map_err(|e| Error::InvalidUrl(format!("{raw}: {e}")))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let entries = try_join_all(requests.iter().map(|(raw, request)| async move {
        let response = fetcher
            .fetch(request)
            .await
            .map_err(|e| Error::BootstrapFailed { url: raw.to_string(), reason: e.to_string() })?;
        if !response.is_ok() {
            return Err(Error::BootstrapFailed { url: raw.to_string(), reason: format!("status {}", response.status) });
        }
        Ok((request.cache_key(&config.origin), response))
    }))
    .await
    .inspect_err(|e| tracing::warn!(error = %e, "install aborted, previous caches stay in charge"))?;

    cache.put_all(&entries).await?;

    tracing::info!(cache = cache.name(), stored = entries.len(), "precached asset manifest");

    Ok(InstallReport { cache: cache.name().to_string(), stored: entries.len(), skip_waiting: config.skip_waiting })
}

/// Delete every cache whose name is not in the allow-list.
pub(crate) async fn activate(config: &RouterConfig, storage: &Arc<dyn CacheStorage>) -> Result<ActivateReport, Error> {
    let allow = config.allow_list();
    let (retained, stale): (Vec<String>, Vec<String>) =
        storage.keys().await?.into_iter().partition(|name| allow.contains(name));

    let removed = try_join_all(stale.iter().map(|name| storage.delete(name))).await?;
    let deleted: Vec<String> = stale
        .into_iter()
        .zip(removed)
        .filter_map(|(name, existed)| existed.then_some(name))
        .collect();

    tracing::info!(deleted = ?deleted, retained = ?retained, "activated cache generation");

    Ok(ActivateReport { deleted, retained, claim_clients: config.claim_clients })
}
