//! Core types and request-routing policy for shelf.
//!
//! This crate provides:
//! - The cache router (classification, cache-first and
//!   stale-while-revalidate strategies, install/activate lifecycle)
//! - Named cache stores with SQLite and in-memory backends
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;
pub mod fetch;
pub mod request;
pub mod router;

pub use cache::{CacheDb, CacheStorage, MemoryStorage, NamedCache};
pub use config::{AppConfig, RouterConfig};
pub use error::Error;
pub use fetch::Fetcher;
pub use request::{Destination, RequestDescriptor, ResponseSnapshot};
pub use router::{CacheRouter, Classification, FetchOutcome, LifecycleHandler};
