//! Resolution of request targets against the storefront origin.

use url::Url;

#[derive(Debug, Clone, thiserror::Error)]
pub enum UrlError {
    #[error("empty URL")]
    Empty,

    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

fn parse_http(raw: &str) -> Result<Url, UrlError> {
    let parsed = Url::parse(raw).map_err(|e| UrlError::InvalidUrl(e.to_string()))?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        scheme => Err(UrlError::UnsupportedScheme(scheme.to_string())),
    }
}

/// Resolve a request target to an absolute http(s) URL.
///
/// Paths (`/catalogo/`, `static/app.css`) join onto `origin`; targets that
/// carry their own scheme ignore it. Fragments never reach the cache key,
/// so they are dropped here. Host case folding comes from the `url` parser.
pub fn resolve(origin: &str, input: &str) -> Result<Url, UrlError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(UrlError::Empty);
    }

    let mut resolved = if trimmed.contains("://") {
        parse_http(trimmed)?
    } else {
        parse_http(origin.trim())?
            .join(trimmed)
            .map_err(|e| UrlError::InvalidUrl(e.to_string()))?
    };
    resolved.set_fragment(None);
    Ok(resolved)
}
