//! Versioned cache buckets for offline support.
//!
//! This module provides the storage half of the worker:
//! - Named buckets mapping a request (method + URL) to a stored response
//! - A persistent SQLite backend and an in-memory backend
//! - Provenance tags describing where a routed response came from

mod memory;
mod storage;
mod traits;

pub use memory::MemoryStorage;
pub use storage::SqliteStorage;
pub use traits::{CacheStorage, CachedResponse, ResponseSource};
