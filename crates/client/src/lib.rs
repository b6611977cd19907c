//! Network client for shelf.
//!
//! This crate provides the reqwest-backed [`Fetcher`](shelf_core::Fetcher)
//! the cache router uses on misses and revalidations, plus URL helpers
//! shared by the host adapter.

pub mod fetch;

pub use fetch::{FetchClient, FetchConfig, UrlError, resolve};
