//! Structured errors for the host adapter.

/// Errors surfaced to the host as `{"ok":false,...}` replies.
#[derive(Debug, thiserror::Error)]
pub enum HostError {
    /// The event line was not valid JSON or named an unknown event.
    #[error("INVALID_INPUT: {0}")]
    MalformedEvent(String),

    /// A fetch event carried a URL that cannot be resolved.
    #[error("INVALID_URL: {0}")]
    InvalidUrl(String),

    /// The router itself failed.
    #[error(transparent)]
    Router(#[from] shelf_core::Error),
}

impl HostError {
    /// Stable error code for the reply envelope.
    pub fn code(&self) -> &'static str {
        match self {
            HostError::MalformedEvent(_) => "INVALID_INPUT",
            HostError::InvalidUrl(_) => "INVALID_URL",
            HostError::Router(e) => e.code(),
        }
    }
}
