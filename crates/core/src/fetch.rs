//! The network seam.

use async_trait::async_trait;

use crate::Error;
use crate::request::{RequestDescriptor, ResponseSnapshot};

/// Issues network requests on the router's behalf.
///
/// An HTTP error status is still a response: implementations return
/// `Ok` for any status and reserve `Err` for transport failures (DNS,
/// connection, timeout, oversize body).
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, request: &RequestDescriptor) -> Result<ResponseSnapshot, Error>;
}
