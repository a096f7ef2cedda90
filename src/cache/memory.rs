//! In-memory cache storage, for tests and dry runs.

use chrono::Utc;
use color_eyre::{eyre::eyre, Result};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use super::traits::{CacheStorage, CachedResponse};
use crate::http::{Request, Response};

#[derive(Default)]
struct Buckets {
  /// Bucket names in creation order
  order: Vec<String>,
  entries: HashMap<String, HashMap<String, CachedResponse>>,
}

/// Storage that keeps every bucket in memory and forgets it on drop.
#[derive(Default)]
pub struct MemoryStorage {
  inner: Mutex<Buckets>,
}

impl MemoryStorage {
  pub fn new() -> Self {
    Self::default()
  }

  fn lock(&self) -> Result<MutexGuard<'_, Buckets>> {
    self.inner.lock().map_err(|e| eyre!("Lock poisoned: {}", e))
  }
}

impl Buckets {
  fn ensure(&mut self, bucket: &str) -> &mut HashMap<String, CachedResponse> {
    if !self.entries.contains_key(bucket) {
      self.order.push(bucket.to_string());
    }
    self.entries.entry(bucket.to_string()).or_default()
  }
}

impl CacheStorage for MemoryStorage {
  fn open(&self, bucket: &str) -> Result<()> {
    self.lock()?.ensure(bucket);
    Ok(())
  }

  fn has(&self, bucket: &str) -> Result<bool> {
    Ok(self.lock()?.entries.contains_key(bucket))
  }

  fn keys(&self) -> Result<Vec<String>> {
    Ok(self.lock()?.order.clone())
  }

  fn delete(&self, bucket: &str) -> Result<bool> {
    let mut buckets = self.lock()?;
    buckets.order.retain(|name| name != bucket);
    Ok(buckets.entries.remove(bucket).is_some())
  }

  fn put(&self, bucket: &str, request: &Request, response: &Response) -> Result<()> {
    let entry = CachedResponse {
      response: response.clone(),
      bucket: bucket.to_string(),
      cached_at: Utc::now(),
    };
    self
      .lock()?
      .ensure(bucket)
      .insert(request.cache_key(), entry);
    Ok(())
  }

  fn put_all(&self, bucket: &str, entries: &[(Request, Response)]) -> Result<()> {
    let cached_at = Utc::now();
    let mut buckets = self.lock()?;
    let stored = buckets.ensure(bucket);
    for (request, response) in entries {
      stored.insert(
        request.cache_key(),
        CachedResponse {
          response: response.clone(),
          bucket: bucket.to_string(),
          cached_at,
        },
      );
    }
    Ok(())
  }

  fn match_in(&self, bucket: &str, request: &Request) -> Result<Option<CachedResponse>> {
    Ok(
      self
        .lock()?
        .entries
        .get(bucket)
        .and_then(|entries| entries.get(&request.cache_key()))
        .cloned(),
    )
  }

  fn entry_count(&self, bucket: &str) -> Result<usize> {
    Ok(
      self
        .lock()?
        .entries
        .get(bucket)
        .map(HashMap::len)
        .unwrap_or(0),
    )
  }
}
