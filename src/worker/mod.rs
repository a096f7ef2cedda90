//! The offline cache and notification worker.
//!
//! A `Worker` owns the cache storage for its origin and talks to the host
//! through three injected facilities: the network, the open windows, and the
//! notification tray. Every handler is an async fn whose future settles only
//! after all network fetches and cache writes it started have completed.

mod click;
mod event;
mod lifecycle;
mod push;
mod router;

#[cfg(test)]
mod testing;

use color_eyre::{eyre::eyre, Result};
use std::sync::{Arc, Mutex};

use crate::cache::CacheStorage;
use crate::clients::Clients;
use crate::config::Config;
use crate::network::Network;
use crate::notify::Notifier;

pub use click::ClickAction;
pub use event::{WorkerEvent, WorkerOutcome};
pub use lifecycle::{ActivateReport, InstallReport};
pub use push::PushPayload;
pub use router::{FetchOutcome, RouteCategory, RoutedResponse};

/// Lifecycle state of a worker version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
  Parsed,
  Installing,
  Installed,
  Activating,
  Activated,
  /// Install failed; this version never takes control
  Redundant,
}

/// Host facilities the worker drives.
#[derive(Clone)]
pub struct Host {
  pub network: Arc<dyn Network>,
  pub clients: Arc<dyn Clients>,
  pub notifier: Arc<dyn Notifier>,
}

pub struct Worker<S: CacheStorage> {
  config: Config,
  storage: Arc<S>,
  host: Host,
  state: Mutex<WorkerState>,
}

impl<S: CacheStorage> Worker<S> {
  pub fn new(config: Config, storage: S, host: Host) -> Self {
    Self {
      config,
      storage: Arc::new(storage),
      host,
      state: Mutex::new(WorkerState::Parsed),
    }
  }

  pub fn config(&self) -> &Config {
    &self.config
  }

  pub fn storage(&self) -> &S {
    &self.storage
  }

  pub fn host(&self) -> &Host {
    &self.host
  }

  /// Name of the bucket this version reads and writes.
  pub fn current_bucket(&self) -> &str {
    &self.config.cache_version
  }

  pub fn state(&self) -> WorkerState {
    match self.state.lock() {
      Ok(state) => *state,
      Err(poisoned) => *poisoned.into_inner(),
    }
  }

  fn set_state(&self, next: WorkerState) -> Result<()> {
    let mut state = self
      .state
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;
    let previous = *state;
    tracing::debug!(from = ?previous, to = ?next, "Worker state change");
    *state = next;
    Ok(())
  }
}
