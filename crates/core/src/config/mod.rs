//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (SHELF_*)
//! 2. TOML config file (if SHELF_CONFIG_FILE set)
//! 3. Built-in defaults
//!
//! The loaded [`AppConfig`] is turned into a [`RouterConfig`], the explicit
//! structure the cache router is constructed with.

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use url::Url;

mod validation;

pub use validation::ConfigError;

/// Names of the three strategy caches.
///
/// Names are versioned by suffix; bumping a suffix is how a deploy busts a
/// cache, since activation deletes every name not listed here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheNames {
    /// Cache-first store for static assets and the install manifest.
    #[serde(default = "default_static_cache")]
    pub static_cache: String,

    /// Stale-while-revalidate store for precached HTML pages.
    #[serde(default = "default_html_cache")]
    pub html_cache: String,

    /// Stale-while-revalidate store for images and media.
    #[serde(default = "default_image_cache")]
    pub image_cache: String,
}

fn default_static_cache() -> String {
    "papelaria-static-v2".into()
}

fn default_html_cache() -> String {
    "papelaria-html-v1".into()
}

fn default_image_cache() -> String {
    "papelaria-img-v1".into()
}

impl Default for CacheNames {
    fn default() -> Self {
        Self { static_cache: default_static_cache(), html_cache: default_html_cache(), image_cache: default_image_cache() }
    }
}

impl CacheNames {
    /// Every cache name the router may open, in declaration order.
    pub fn allow_list(&self) -> Vec<String> {
        vec![self.static_cache.clone(), self.html_cache.clone(), self.image_cache.clone()]
    }
}

/// URL-pattern rules used by the request classifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteRules {
    /// Substring marking static assets (matched against the whole URL).
    #[serde(default = "default_static_prefix")]
    pub static_prefix: String,

    /// Substring marking uploaded media (matched against the whole URL).
    #[serde(default = "default_media_prefix")]
    pub media_prefix: String,

    /// Path suffixes treated as images, with the leading dot.
    #[serde(default = "default_image_extensions")]
    pub image_extensions: Vec<String>,
}

fn default_static_prefix() -> String {
    "/static/".into()
}

fn default_media_prefix() -> String {
    "/media/".into()
}

fn default_image_extensions() -> Vec<String> {
    vec![".jpg".into()]
}

impl Default for RouteRules {
    fn default() -> Self {
        Self {
            static_prefix: default_static_prefix(),
            media_prefix: default_media_prefix(),
            image_extensions: default_image_extensions(),
        }
    }
}

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (SHELF_*)
/// 2. TOML config file (if SHELF_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Origin of the storefront whose requests are intercepted.
    ///
    /// Set via SHELF_ORIGIN environment variable.
    #[serde(default = "default_origin")]
    pub origin: String,

    /// Path to SQLite cache database.
    ///
    /// Set via SHELF_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Strategy cache names.
    ///
    /// Set via SHELF_CACHES__STATIC_CACHE and friends.
    #[serde(default)]
    pub caches: CacheNames,

    /// Assets eagerly stored in the static cache at install time.
    #[serde(default = "default_assets")]
    pub assets: Vec<String>,

    /// Same-origin paths served stale-while-revalidate from the HTML cache.
    #[serde(default = "default_precache_urls")]
    pub precache_urls: Vec<String>,

    /// Whether the precache paths are also fetched during install.
    #[serde(default = "default_true")]
    pub precache_in_manifest: bool,

    /// Classifier rules.
    #[serde(default)]
    pub rules: RouteRules,

    /// Ask the host to activate a new version without waiting.
    #[serde(default = "default_true")]
    pub skip_waiting: bool,

    /// Ask the host to take control of already open pages on activation.
    #[serde(default = "default_true")]
    pub claim_clients: bool,

    /// User-Agent string for network requests.
    ///
    /// Set via SHELF_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Maximum bytes to fetch per request.
    ///
    /// Set via SHELF_MAX_BYTES environment variable.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// HTTP request timeout in milliseconds.
    ///
    /// Set via SHELF_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_origin() -> String {
    "http://localhost:8000".into()
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./shelf-cache.sqlite")
}

fn default_assets() -> Vec<String> {
    vec!["/static/manifest.json".into(), "/static/img/icon.png".into()]
}

fn default_precache_urls() -> Vec<String> {
    vec!["/".into(), "/catalogo/".into()]
}

fn default_user_agent() -> String {
    "shelf/0.1".into()
}

fn default_max_bytes() -> usize {
    5_242_880 // 5MB
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_true() -> bool {
    true
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            origin: default_origin(),
            db_path: default_db_path(),
            caches: CacheNames::default(),
            assets: default_assets(),
            precache_urls: default_precache_urls(),
            precache_in_manifest: true,
            rules: RouteRules::default(),
            skip_waiting: true,
            claim_clients: true,
            user_agent: default_user_agent(),
            max_bytes: default_max_bytes(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `SHELF_`
    /// 2. TOML file from `SHELF_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("SHELF_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("SHELF_")
                .ignore(&["config_file"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }

    /// Parsed storefront origin.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if the origin is not an http(s) URL.
    pub fn origin_url(&self) -> Result<Url, ConfigError> {
        let url = Url::parse(&self.origin)
            .map_err(|e| ConfigError::Invalid { field: "origin".into(), reason: e.to_string() })?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            scheme => Err(ConfigError::Invalid { field: "origin".into(), reason: format!("unsupported scheme {scheme}") }),
        }
    }

    /// Asset manifest: configured assets, then the precache paths when
    /// `precache_in_manifest` is set. Duplicates keep their first position.
    pub fn manifest(&self) -> Vec<String> {
        let mut seen = BTreeSet::new();
        let extra = if self.precache_in_manifest { self.precache_urls.as_slice() } else { &[] };
        self.assets
            .iter()
            .chain(extra)
            .filter(|u| seen.insert(u.as_str()))
            .cloned()
            .collect()
    }

    /// Build the explicit router configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if the origin cannot be parsed.
    pub fn router_config(&self) -> Result<RouterConfig, ConfigError> {
        Ok(RouterConfig {
            origin: self.origin_url()?,
            caches: self.caches.clone(),
            manifest: self.manifest(),
            precache_urls: self.precache_urls.iter().cloned().collect(),
            rules: self.rules.clone(),
            skip_waiting: self.skip_waiting,
            claim_clients: self.claim_clients,
        })
    }
}

/// Everything the cache router needs, passed in at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouterConfig {
    pub origin: Url,
    pub caches: CacheNames,
    /// Ordered install-time manifest (relative paths resolve against `origin`).
    pub manifest: Vec<String>,
    pub precache_urls: BTreeSet<String>,
    pub rules: RouteRules,
    pub skip_waiting: bool,
    pub claim_clients: bool,
}

impl RouterConfig {
    /// Default storefront configuration rooted at `origin`.
    pub fn for_origin(origin: Url) -> Self {
        let app = AppConfig::default();
        Self {
            origin,
            caches: app.caches.clone(),
            manifest: app.manifest(),
            precache_urls: app.precache_urls.iter().cloned().collect(),
            rules: app.rules,
            skip_waiting: app.skip_waiting,
            claim_clients: app.claim_clients,
        }
    }

    /// Cache names that survive activation.
    pub fn allow_list(&self) -> Vec<String> {
        self.caches.allow_list()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.origin, "http://localhost:8000");
        assert_eq!(config.db_path, PathBuf::from("./shelf-cache.sqlite"));
        assert_eq!(config.caches.static_cache, "papelaria-static-v2");
        assert_eq!(config.caches.html_cache, "papelaria-html-v1");
        assert_eq!(config.caches.image_cache, "papelaria-img-v1");
        assert_eq!(config.rules.static_prefix, "/static/");
        assert_eq!(config.rules.media_prefix, "/media/");
        assert_eq!(config.rules.image_extensions, vec![".jpg".to_string()]);
        assert_eq!(config.user_agent, "shelf/0.1");
        assert_eq!(config.max_bytes, 5_242_880);
        assert!(config.skip_waiting);
        assert!(config.claim_clients);
    }

    #[test]
    fn test_timeout_duration() {
        let config = AppConfig::default();
        assert_eq!(config.timeout(), Duration::from_millis(20_000));
    }

    #[test]
    fn test_manifest_includes_precache_urls() {
        let config = AppConfig::default();
        assert_eq!(config.manifest(), vec!["/static/manifest.json", "/static/img/icon.png", "/", "/catalogo/"]);
    }

    #[test]
    fn test_manifest_without_precache_urls() {
        let config = AppConfig { precache_in_manifest: false, ..Default::default() };
        assert_eq!(config.manifest(), vec!["/static/manifest.json", "/static/img/icon.png"]);
    }

    #[test]
    fn test_manifest_dedupes() {
        let config = AppConfig { assets: vec!["/".into(), "/a.css".into()], ..Default::default() };
        assert_eq!(config.manifest(), vec!["/", "/a.css", "/catalogo/"]);
    }

    #[test]
    fn test_allow_list_matches_cache_names() {
        let router = AppConfig::default().router_config().unwrap();
        assert_eq!(router.allow_list(), vec!["papelaria-static-v2", "papelaria-html-v1", "papelaria-img-v1"]);
    }

    #[test]
    fn test_origin_rejects_non_http() {
        let config = AppConfig { origin: "ftp://example.com".into(), ..Default::default() };
        assert!(matches!(config.origin_url(), Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn test_load_layers_toml_and_env() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "shelf.toml",
                r#"
                origin = "https://loja.example"
                precache_urls = ["/"]

                [caches]
                static_cache = "papelaria-static-v3"
                "#,
            )?;
            jail.set_env("SHELF_CONFIG_FILE", "shelf.toml");
            jail.set_env("SHELF_CACHES__IMAGE_CACHE", "papelaria-img-v2");

            let config = AppConfig::load().map_err(|e| e.to_string())?;
            assert_eq!(config.origin, "https://loja.example");
            assert_eq!(config.caches.static_cache, "papelaria-static-v3");
            assert_eq!(config.caches.html_cache, "papelaria-html-v1");
            assert_eq!(config.caches.image_cache, "papelaria-img-v2");
            assert_eq!(config.precache_urls, vec!["/".to_string()]);
            Ok(())
        });
    }
}
