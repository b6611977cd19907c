//! Named cache stores.
//!
//! The router talks to a [`CacheStorage`] registry of named caches. Two
//! stores ship here:
//!
//! - [`CacheDb`]: persistent, SQLite via tokio-rusqlite, WAL mode, with
//!   automatic schema migrations and cascade delete of a cache's entries
//! - [`MemoryStorage`]: process-local, for tests and embedding

pub mod connection;
pub mod entries;
pub mod hash;
pub mod memory;
pub mod migrations;
pub mod storage;

pub use crate::Error;

pub use connection::CacheDb;
pub use memory::MemoryStorage;
pub use storage::{CacheStorage, NamedCache};
