//! Request descriptors and response snapshots.
//!
//! These are the only shapes the router sees: the host translates its own
//! request objects into a [`RequestDescriptor`] and gets [`ResponseSnapshot`]s
//! back, whether they came from a cache or the network.

use std::fmt;

use serde::{Deserialize, Serialize};
use url::Url;

/// Declared resource type of an intercepted request.
///
/// Mirrors the fetch destinations a browser attaches to subresource loads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Destination {
    Document,
    Image,
    Script,
    Style,
    Font,
    Manifest,
    Audio,
    Video,
    /// No declared destination (e.g. `fetch()` from script).
    #[default]
    #[serde(rename = "")]
    Empty,
    /// Any other destination, e.g. `worker` or `iframe`.
    #[serde(other)]
    Other,
}

/// An intercepted request: method, absolute URL and declared resource type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestDescriptor {
    pub method: String,
    pub url: Url,
    pub destination: Destination,
}

impl RequestDescriptor {
    /// A plain GET with no declared destination.
    pub fn get(url: Url) -> Self {
        Self { method: "GET".to_string(), url, destination: Destination::Empty }
    }

    /// Override the declared destination.
    pub fn with_destination(mut self, destination: Destination) -> Self {
        self.destination = destination;
        self
    }

    /// Override the method.
    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.method = method.into();
        self
    }

    pub fn is_get(&self) -> bool {
        self.method.eq_ignore_ascii_case("GET")
    }

    /// Whether the request targets the same scheme/host/port as `origin`.
    pub fn is_same_origin(&self, origin: &Url) -> bool {
        self.url.origin() == origin.origin()
    }

    /// Cache identity of this request.
    ///
    /// Same-origin requests are keyed by path and query so entries survive a
    /// change of host name; anything else is keyed by its full URL.
    pub fn cache_key(&self, origin: &Url) -> String {
        if self.is_same_origin(origin) {
            match self.url.query() {
                Some(q) => format!("{}?{}", self.url.path(), q),
                None => self.url.path().to_string(),
            }
        } else {
            let mut url = self.url.clone();
            url.set_fragment(None);
            url.to_string()
        }
    }
}

impl fmt::Display for RequestDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.url)
    }
}

/// A response representation as stored in a named cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseSnapshot {
    /// Final URL the response was served from.
    pub url: String,
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl ResponseSnapshot {
    pub fn new(url: impl Into<String>, status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self { url: url.into(), status, headers: Vec::new(), body: body.into() }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// HTTP ok status (200..=299).
    pub fn is_ok(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// First header value matching `name` (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }
}
