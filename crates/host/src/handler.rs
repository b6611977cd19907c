//! Host adapter: wires stdio events to the cache router.
//!
//! Each input line is one JSON event; each event yields exactly one JSON
//! reply line. The adapter is the only place that knows about the wire
//! shape; the router only sees request descriptors.

use serde::{Deserialize, Serialize};
use shelf_core::router::{ActivateReport, InstallReport, ResponseSource};
use shelf_core::{CacheRouter, Classification, Destination, FetchOutcome, LifecycleHandler, RequestDescriptor};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};

use crate::error::HostError;

/// A lifecycle event delivered by the host.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum HostEvent {
    Install,
    Activate,
    Fetch {
        #[serde(default = "default_method")]
        method: String,
        url: String,
        #[serde(default)]
        destination: Destination,
    },
    /// List existing cache names.
    Caches,
}

fn default_method() -> String {
    "GET".into()
}

/// Result of a fetch event.
#[derive(Debug, Clone, Serialize)]
pub struct FetchReply {
    /// `respond` or `passthrough`.
    pub disposition: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub classification: Option<Classification>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<ResponseSource>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub headers: Vec<(String, String)>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body_len: Option<usize>,
    /// Body text, when it is valid UTF-8.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

impl From<FetchOutcome> for FetchReply {
    fn from(outcome: FetchOutcome) -> Self {
        match outcome {
            FetchOutcome::Passthrough => Self {
                disposition: "passthrough",
                classification: None,
                source: None,
                status: None,
                url: None,
                headers: Vec::new(),
                body_len: None,
                body: None,
            },
            FetchOutcome::Respond { response, classification, source } => Self {
                disposition: "respond",
                classification: Some(classification),
                source: Some(source),
                status: Some(response.status),
                url: Some(response.url),
                headers: response.headers,
                body_len: Some(response.body.len()),
                body: String::from_utf8(response.body).ok(),
            },
        }
    }
}

/// Successful reply payloads, tagged by event.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum HostReply {
    Install(InstallReport),
    Activate(ActivateReport),
    Fetch(FetchReply),
    Caches { names: Vec<String> },
}

#[derive(Serialize)]
struct Success<'a> {
    ok: bool,
    #[serde(flatten)]
    reply: &'a HostReply,
}

#[derive(Serialize)]
struct Failure<'a> {
    ok: bool,
    code: &'a str,
    message: String,
}

/// Drives a [`CacheRouter`] from host events.
pub struct HostAdapter {
    router: CacheRouter,
}

impl HostAdapter {
    pub fn new(router: CacheRouter) -> Self {
        Self { router }
    }

    /// Dispatch one event.
    pub async fn dispatch(&self, event: HostEvent) -> Result<HostReply, HostError> {
        match event {
            HostEvent::Install => Ok(HostReply::Install(self.router.on_install().await?)),
            HostEvent::Activate => Ok(HostReply::Activate(self.router.on_activate().await?)),
            HostEvent::Caches => Ok(HostReply::Caches { names: self.router.storage().keys().await? }),
            HostEvent::Fetch { method, url, destination } => {
                let origin = self.router.config().origin.as_str();
                let url = shelf_client::resolve(origin, &url).map_err(|e| HostError::InvalidUrl(e.to_string()))?;
                let request = RequestDescriptor::get(url)
                    .with_method(method)
                    .with_destination(destination);
                let outcome = self.router.on_fetch(&request).await?;
                Ok(HostReply::Fetch(outcome.into()))
            }
        }
    }

    /// Parse, dispatch and encode one input line.
    pub async fn handle_line(&self, line: &str) -> String {
        let result = match serde_json::from_str::<HostEvent>(line) {
            Ok(event) => self.dispatch(event).await,
            Err(e) => Err(HostError::MalformedEvent(e.to_string())),
        };

        let encoded = match &result {
            Ok(reply) => serde_json::to_string(&Success { ok: true, reply }),
            Err(err) => {
                tracing::warn!(code = err.code(), error = %err, "event failed");
                serde_json::to_string(&Failure { ok: false, code: err.code(), message: err.to_string() })
            }
        };

        encoded.unwrap_or_else(|e| {
            format!(r#"{{"ok":false,"code":"INVALID_INPUT","message":"failed to encode reply: {e}"}}"#)
        })
    }

    /// Serve events until `input` reaches EOF, then wait for background
    /// cache work to finish.
    pub async fn serve<R, W>(&self, input: R, mut output: W) -> std::io::Result<()>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = BufReader::new(input).lines();
        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }
            let reply = self.handle_line(&line).await;
            output.write_all(reply.as_bytes()).await?;
            output.write_all(b"\n").await?;
            output.flush().await?;
        }

        tracing::info!(pending = self.router.pending_tasks(), "input closed, settling background work");
        self.router.settle().await;
        Ok(())
    }
}
