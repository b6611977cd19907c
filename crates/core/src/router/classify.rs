//! Request classification.
//!
//! A pure function from request shape to the strategy that serves it. Check
//! order matters: precache paths beat the static prefix, which beats the
//! image heuristics.

use serde::{Deserialize, Serialize};

use crate::config::{CacheNames, RouterConfig};
use crate::request::{Destination, RequestDescriptor};

/// Which policy an intercepted request falls under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    /// Static asset, served cache-first from the static cache.
    Static,
    /// Precached page, served stale-while-revalidate from the HTML cache.
    HtmlPrecache,
    /// Image or media, served stale-while-revalidate from the image cache.
    Image,
    /// Not intercepted; the host handles it over the network, uncached.
    Unhandled,
}

/// How a classified request is served.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    CacheFirst,
    StaleWhileRevalidate,
}

impl Classification {
    pub fn strategy(self) -> Option<Strategy> {
        match self {
            Self::Static => Some(Strategy::CacheFirst),
            Self::HtmlPrecache | Self::Image => Some(Strategy::StaleWhileRevalidate),
            Self::Unhandled => None,
        }
    }

    /// The only cache this classification may read or write.
    pub fn cache_name(self, caches: &CacheNames) -> Option<&str> {
        match self {
            Self::Static => Some(&caches.static_cache),
            Self::HtmlPrecache => Some(&caches.html_cache),
            Self::Image => Some(&caches.image_cache),
            Self::Unhandled => None,
        }
    }
}

/// Classify an intercepted request.
pub fn classify(config: &RouterConfig, request: &RequestDescriptor) -> Classification {
    if !request.is_get() {
        return Classification::Unhandled;
    }

    if request.is_same_origin(&config.origin) && config.precache_urls.contains(request.url.path()) {
        return Classification::HtmlPrecache;
    }

    let rules = &config.rules;
    let url = request.url.as_str();

    if url.contains(&rules.static_prefix) {
        return Classification::Static;
    }

    let path = request.url.path().to_ascii_lowercase();
    let is_image_ext = rules
        .image_extensions
        .iter()
        .any(|ext| path.ends_with(&ext.to_ascii_lowercase()));

    if request.destination == Destination::Image || url.contains(&rules.media_prefix) || is_image_ext {
        return Classification::Image;
    }

    Classification::Unhandled
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;

    fn config() -> RouterConfig {
        RouterConfig::for_origin(Url::parse("https://loja.example").unwrap())
    }

    fn get(url: &str) -> RequestDescriptor {
        RequestDescriptor::get(Url::parse(url).unwrap())
    }

    #[test]
    fn test_non_get_is_unhandled() {
        let req = get("https://loja.example/static/app.css").with_method("POST");
        assert_eq!(classify(&config(), &req), Classification::Unhandled);
    }

    #[test]
    fn test_precache_paths() {
        assert_eq!(classify(&config(), &get("https://loja.example/")), Classification::HtmlPrecache);
        assert_eq!(classify(&config(), &get("https://loja.example/catalogo/")), Classification::HtmlPrecache);
        assert_eq!(classify(&config(), &get("https://loja.example/catalogo/?page=2")), Classification::HtmlPrecache);
    }

    #[test]
    fn test_precache_requires_same_origin() {
        assert_eq!(classify(&config(), &get("https://other.example/catalogo/")), Classification::Unhandled);
    }

    #[test]
    fn test_precache_beats_static_prefix() {
        let mut cfg = config();
        cfg.precache_urls.insert("/static/offline.html".into());
        let req = get("https://loja.example/static/offline.html");
        assert_eq!(classify(&cfg, &req), Classification::HtmlPrecache);
    }

    #[test]
    fn test_static_prefix() {
        assert_eq!(classify(&config(), &get("https://loja.example/static/manifest.json")), Classification::Static);
        assert_eq!(classify(&config(), &get("https://cdn.example/static/app.js")), Classification::Static);
    }

    #[test]
    fn test_static_beats_image_heuristics() {
        let req = get("https://loja.example/static/img/banner.jpg").with_destination(Destination::Image);
        assert_eq!(classify(&config(), &req), Classification::Static);
    }

    #[test]
    fn test_other_destination_follows_url_rules() {
        let worker = get("https://loja.example/static/app.js").with_destination(Destination::Other);
        assert_eq!(classify(&config(), &worker), Classification::Static);
        let frame = get("https://loja.example/carrinho/").with_destination(Destination::Other);
        assert_eq!(classify(&config(), &frame), Classification::Unhandled);
    }

    #[test]
    fn test_image_destination() {
        let req = get("https://cdn.example/p/123").with_destination(Destination::Image);
        assert_eq!(classify(&config(), &req), Classification::Image);
    }

    #[test]
    fn test_media_prefix() {
        assert_eq!(classify(&config(), &get("https://loja.example/media/capas/a.png")), Classification::Image);
    }

    #[test]
    fn test_image_extension_case_insensitive() {
        assert_eq!(classify(&config(), &get("https://cdn.example/foto.JPG")), Classification::Image);
        assert_eq!(classify(&config(), &get("https://cdn.example/foto.jpg?w=300")), Classification::Image);
    }

    #[test]
    fn test_unhandled_pages() {
        assert_eq!(classify(&config(), &get("https://loja.example/carrinho/")), Classification::Unhandled);
        assert_eq!(classify(&config(), &get("https://loja.example/api/pedidos")), Classification::Unhandled);
    }

    #[test]
    fn test_strategy_and_cache_mapping() {
        let caches = CacheNames::default();
        assert_eq!(Classification::Static.strategy(), Some(Strategy::CacheFirst));
        assert_eq!(Classification::Image.strategy(), Some(Strategy::StaleWhileRevalidate));
        assert_eq!(Classification::Unhandled.strategy(), None);
        assert_eq!(Classification::HtmlPrecache.cache_name(&caches), Some("papelaria-html-v1"));
        assert_eq!(Classification::Unhandled.cache_name(&caches), None);
    }
}
