//! Core traits and types for the caching system.

use chrono::{DateTime, Utc};
use color_eyre::Result;

use crate::http::{Request, Response};

/// A stored response.
#[derive(Debug, Clone)]
pub struct CachedResponse {
  /// The stored response snapshot
  pub response: Response,
  /// Bucket the entry was found in
  pub bucket: String,
  /// When the entry was last written
  pub cached_at: DateTime<Utc>,
}

/// Trait for cache storage backends.
///
/// A backend holds named buckets, each mapping a request key to a response.
/// Every call is atomic on its own; overlapping writes to the same key are
/// last-write-wins.
pub trait CacheStorage: Send + Sync {
  /// Create the bucket if it does not exist yet.
  fn open(&self, bucket: &str) -> Result<()>;

  /// Whether a bucket with this name exists.
  fn has(&self, bucket: &str) -> Result<bool>;

  /// Names of all buckets, in creation order.
  fn keys(&self) -> Result<Vec<String>>;

  /// Delete a bucket and every entry in it. Returns false if it did not exist.
  fn delete(&self, bucket: &str) -> Result<bool>;

  /// Store (or overwrite) the response for a request, creating the bucket if needed.
  fn put(&self, bucket: &str, request: &Request, response: &Response) -> Result<()>;

  /// Store several responses at once, creating the bucket if needed.
  /// Either every entry is written or none is.
  fn put_all(&self, bucket: &str, entries: &[(Request, Response)]) -> Result<()>;

  /// Look a request up in a single bucket.
  fn match_in(&self, bucket: &str, request: &Request) -> Result<Option<CachedResponse>>;

  /// Look a request up across all buckets, oldest bucket first.
  fn match_any(&self, request: &Request) -> Result<Option<CachedResponse>> {
    for bucket in self.keys()? {
      if let Some(hit) = self.match_in(&bucket, request)? {
        return Ok(Some(hit));
      }
    }
    Ok(None)
  }

  /// Number of entries stored in a bucket.
  fn entry_count(&self, bucket: &str) -> Result<usize>;
}

/// Indicates where a routed response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseSource {
  /// Live response from the network
  Network,
  /// Stored response from a cache bucket
  Cache,
  /// Network unavailable, response synthesized locally
  OfflineFallback,
}

impl std::fmt::Display for ResponseSource {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Self::Network => write!(f, "network"),
      Self::Cache => write!(f, "cache"),
      Self::OfflineFallback => write!(f, "offline-fallback"),
    }
  }
}
