//! Request routing and per-category caching policy.

use color_eyre::{eyre::eyre, Result};
use serde_json::json;
use tracing::{debug, warn};

use super::Worker;
use crate::cache::{CacheStorage, ResponseSource};
use crate::http::{Request, Response};

/// Category of a GET request, decided by its path prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteCategory {
  /// `/api/...`: network only, JSON error body when offline
  Api,
  /// `/static/...`: cache first
  Static,
  /// Everything else: network first, cache fallback
  Page,
}

impl RouteCategory {
  pub fn for_path(path: &str) -> Self {
    if path.starts_with("/api/") {
      Self::Api
    } else if path.starts_with("/static/") {
      Self::Static
    } else {
      Self::Page
    }
  }
}

/// A response produced by the worker, with its provenance.
#[derive(Debug, Clone)]
pub struct RoutedResponse {
  pub response: Response,
  pub source: ResponseSource,
}

impl RoutedResponse {
  fn network(response: Response) -> Self {
    Self {
      response,
      source: ResponseSource::Network,
    }
  }

  fn cache(response: Response) -> Self {
    Self {
      response,
      source: ResponseSource::Cache,
    }
  }
}

/// What the worker does with an intercepted request.
#[derive(Debug, Clone)]
pub enum FetchOutcome {
  /// Not intercepted; the host performs the request itself
  Passthrough,
  /// The worker answers the request
  Respond(RoutedResponse),
}

impl<S: CacheStorage> Worker<S> {
  /// Route one intercepted request.
  ///
  /// `Err` means the request fails with no response (network unreachable and
  /// nothing cached); the host falls back to its own offline handling.
  pub async fn handle_fetch(&self, request: &Request) -> Result<FetchOutcome> {
    // Mutating requests never touch the cache
    if !request.is_get() {
      debug!(method = %request.method, url = %request.url, "Passing through");
      return Ok(FetchOutcome::Passthrough);
    }

    let category = RouteCategory::for_path(request.path());
    debug!(url = %request.url, ?category, "Routing request");

    let routed = match category {
      RouteCategory::Api => self.network_only(request).await,
      RouteCategory::Static => self.cache_first(request).await?,
      RouteCategory::Page => self.network_first(request).await?,
    };

    Ok(FetchOutcome::Respond(routed))
  }

  async fn network_only(&self, request: &Request) -> RoutedResponse {
    match self.host.network.fetch(request).await {
      Ok(response) => RoutedResponse::network(response),
      Err(e) => {
        warn!(url = %request.url, "API request failed, answering offline: {}", e);
        RoutedResponse {
          response: Response::json(&json!({ "error": self.config.offline_message })),
          source: ResponseSource::OfflineFallback,
        }
      }
    }
  }

  async fn cache_first(&self, request: &Request) -> Result<RoutedResponse> {
    if let Some(cached) = self.storage.match_any(request)? {
      debug!(url = %request.url, bucket = %cached.bucket, "Cache hit");
      return Ok(RoutedResponse::cache(cached.response));
    }

    let response = self.host.network.fetch(request).await?;
    self.store_copy(request, &response);

    Ok(RoutedResponse::network(response))
  }

  async fn network_first(&self, request: &Request) -> Result<RoutedResponse> {
    match self.host.network.fetch(request).await {
      Ok(response) => {
        self.store_copy(request, &response);
        Ok(RoutedResponse::network(response))
      }
      Err(e) => {
        debug!(url = %request.url, "Network failed, trying cache: {}", e);
        match self.storage.match_any(request)? {
          Some(cached) => Ok(RoutedResponse::cache(cached.response)),
          None => Err(eyre!("{} is unreachable and not cached: {}", request.url, e)),
        }
      }
    }
  }

  /// Write a copy of `response` into the current bucket. A failed write is
  /// logged and never affects the response already on its way to the page.
  fn store_copy(&self, request: &Request, response: &Response) {
    if let Err(e) = self.storage.put(self.current_bucket(), request, response) {
      warn!(url = %request.url, "Failed to cache response: {}", e);
    }
  }
}
