//! Fakes shared by the worker tests.

use async_trait::async_trait;
use color_eyre::{eyre::eyre, Result};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use super::{Host, Worker};
use crate::cache::{CacheStorage, CachedResponse, MemoryStorage};
use crate::clients::WindowRegistry;
use crate::config::Config;
use crate::http::{Request, Response};
use crate::network::Network;
use crate::notify::NotificationTray;

/// Network with scripted responses and an offline switch.
#[derive(Default)]
pub struct FakeNetwork {
  routes: Mutex<HashMap<String, Response>>,
  offline: AtomicBool,
  calls: Mutex<Vec<String>>,
}

impl FakeNetwork {
  pub fn route(&self, url: &str, response: Response) {
    self
      .routes
      .lock()
      .unwrap()
      .insert(url.to_string(), response);
  }

  pub fn set_offline(&self, offline: bool) {
    self.offline.store(offline, Ordering::SeqCst);
  }

  /// "METHOD url" for every fetch attempted, in order.
  pub fn calls(&self) -> Vec<String> {
    self.calls.lock().unwrap().clone()
  }
}

#[async_trait]
impl Network for FakeNetwork {
  async fn fetch(&self, request: &Request) -> Result<Response> {
    self
      .calls
      .lock()
      .unwrap()
      .push(format!("{} {}", request.method, request.url));

    if self.offline.load(Ordering::SeqCst) {
      return Err(eyre!("network unreachable"));
    }

    Ok(
      self
        .routes
        .lock()
        .unwrap()
        .get(request.url.as_str())
        .cloned()
        .unwrap_or_else(|| Response::new(404, "not found")),
    )
  }
}

/// Storage that reads normally but rejects every write.
#[derive(Default)]
pub struct FailingWrites {
  inner: MemoryStorage,
}

impl CacheStorage for FailingWrites {
  fn open(&self, bucket: &str) -> Result<()> {
    self.inner.open(bucket)
  }

  fn has(&self, bucket: &str) -> Result<bool> {
    self.inner.has(bucket)
  }

  fn keys(&self) -> Result<Vec<String>> {
    self.inner.keys()
  }

  fn delete(&self, bucket: &str) -> Result<bool> {
    self.inner.delete(bucket)
  }

  fn put(&self, _bucket: &str, _request: &Request, _response: &Response) -> Result<()> {
    Err(eyre!("disk full"))
  }

  fn put_all(&self, _bucket: &str, _entries: &[(Request, Response)]) -> Result<()> {
    Err(eyre!("disk full"))
  }

  fn match_in(&self, bucket: &str, request: &Request) -> Result<Option<CachedResponse>> {
    self.inner.match_in(bucket, request)
  }

  fn entry_count(&self, bucket: &str) -> Result<usize> {
    self.inner.entry_count(bucket)
  }
}

pub struct Fixture<S: CacheStorage = MemoryStorage> {
  pub worker: Worker<S>,
  pub network: Arc<FakeNetwork>,
  pub clients: Arc<WindowRegistry>,
  pub tray: Arc<NotificationTray>,
}

pub const ORIGIN: &str = "http://localhost:8000/";

pub fn config() -> Config {
  Config {
    precache: vec![
      "/".to_string(),
      "/static/css/design-system.css".to_string(),
      "https://cdn.example.com/bootstrap.min.css".to_string(),
    ],
    ..Config::default()
  }
}

pub fn fixture_with_storage<S: CacheStorage>(config: Config, storage: S) -> Fixture<S> {
  let network = Arc::new(FakeNetwork::default());
  let clients = Arc::new(WindowRegistry::new());
  let tray = Arc::new(NotificationTray::new());

  let host = Host {
    network: network.clone(),
    clients: clients.clone(),
    notifier: tray.clone(),
  };

  Fixture {
    worker: Worker::new(config, storage, host),
    network,
    clients,
    tray,
  }
}

pub fn fixture() -> Fixture {
  fixture_with_storage(config(), MemoryStorage::new())
}

/// Fixture whose network serves every precache URL.
pub fn online_fixture() -> Fixture {
  online_fixture_with_storage(MemoryStorage::new())
}

pub fn online_fixture_with_storage<S: CacheStorage>(storage: S) -> Fixture<S> {
  let fixture = fixture_with_storage(config(), storage);
  fixture
    .network
    .route(&url("/").to_string(), Response::new(200, "<html>shell</html>"));
  fixture.network.route(
    &url("/static/css/design-system.css").to_string(),
    Response::new(200, "body {}"),
  );
  fixture.network.route(
    "https://cdn.example.com/bootstrap.min.css",
    Response::new(200, ".btn {}"),
  );
  fixture
}

pub fn url(path: &str) -> url::Url {
  url::Url::parse(ORIGIN).unwrap().join(path).unwrap()
}
