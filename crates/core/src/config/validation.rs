//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use std::collections::BTreeSet;

use crate::config::AppConfig;
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },
}

fn invalid(field: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid { field: field.into(), reason: reason.into() }
}

fn is_servable(url: &str) -> bool {
    url.starts_with('/') || url.starts_with("http://") || url.starts_with("https://")
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `origin` is not an http(s) URL
    /// - a cache name is empty, or two cache names collide
    /// - an asset is neither a rooted path nor an http(s) URL
    /// - a precache path does not start with `/`
    /// - a classifier prefix is empty or an image extension lacks its dot
    /// - `max_bytes` is 0 or exceeds 50MB
    /// - `timeout_ms` is less than 100ms or exceeds 5 minutes
    /// - `user_agent` is empty
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.origin_url()?;

        let names = self.caches.allow_list();
        if names.iter().any(|n| n.trim().is_empty()) {
            return Err(invalid("caches", "cache names must not be empty"));
        }
        if names.iter().collect::<BTreeSet<_>>().len() != names.len() {
            return Err(invalid("caches", "each strategy needs its own cache name"));
        }

        if let Some(bad) = self.assets.iter().find(|a| !is_servable(a)) {
            return Err(invalid("assets", format!("{bad} is not a rooted path or http(s) URL")));
        }

        if let Some(bad) = self.precache_urls.iter().find(|p| !p.starts_with('/')) {
            return Err(invalid("precache_urls", format!("{bad} must start with '/'")));
        }

        if self.rules.static_prefix.is_empty() {
            return Err(invalid("rules.static_prefix", "must not be empty"));
        }
        if self.rules.media_prefix.is_empty() {
            return Err(invalid("rules.media_prefix", "must not be empty"));
        }
        if let Some(bad) = self
            .rules
            .image_extensions
            .iter()
            .find(|e| e.len() < 2 || !e.starts_with('.'))
        {
            return Err(invalid("rules.image_extensions", format!("{bad} must look like '.jpg'")));
        }

        if self.max_bytes == 0 {
            return Err(invalid("max_bytes", "must be greater than 0"));
        }
        if self.max_bytes > 50 * 1024 * 1024 {
            return Err(invalid("max_bytes", "must not exceed 50MB"));
        }

        if self.timeout_ms < 100 {
            return Err(invalid("timeout_ms", "must be at least 100ms"));
        }
        if self.timeout_ms > 300_000 {
            return Err(invalid("timeout_ms", "must not exceed 5 minutes (300000ms)"));
        }

        if self.user_agent.is_empty() {
            return Err(invalid("user_agent", "must not be empty"));
        }

        if self.precache_urls.is_empty() {
            tracing::warn!("precache_urls is empty; no request will use the HTML cache");
        }

        Ok(())
    }
}
