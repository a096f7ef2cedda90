//! Open windows the worker can inspect and steer.

use async_trait::async_trait;
use color_eyre::{eyre::eyre, Result};
use std::sync::Mutex;
use url::Url;

/// An open window or tab.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowClient {
  pub id: u64,
  pub url: Url,
  pub focused: bool,
  /// Whether this worker currently controls the window
  pub controlled: bool,
}

impl WindowClient {
  /// Whether the window shows a page of `origin`.
  pub fn same_origin(&self, origin: &Url) -> bool {
    self.url.origin() == origin.origin()
  }
}

/// Host facility for enumerating and controlling windows.
#[async_trait]
pub trait Clients: Send + Sync {
  /// All windows, optionally including ones not controlled by this worker.
  async fn match_all(&self, include_uncontrolled: bool) -> Result<Vec<WindowClient>>;

  async fn navigate(&self, id: u64, url: &Url) -> Result<()>;

  async fn focus(&self, id: u64) -> Result<()>;

  /// Open a new window at `url` and return its id.
  async fn open_window(&self, url: &Url) -> Result<u64>;

  /// Take control of every uncontrolled window. Returns how many were claimed.
  async fn claim(&self) -> Result<usize>;
}

#[derive(Debug, Default)]
struct Windows {
  list: Vec<WindowClient>,
  next_id: u64,
}

/// Window table held in memory.
#[derive(Debug, Default)]
pub struct WindowRegistry {
  inner: Mutex<Windows>,
}

impl WindowRegistry {
  pub fn new() -> Self {
    Self::default()
  }

  /// Register an already open, uncontrolled window.
  pub fn add(&self, url: Url) -> Result<u64> {
    let mut windows = self.inner.lock().map_err(|e| eyre!("Lock poisoned: {}", e))?;
    let id = windows.next_id;
    windows.next_id += 1;
    windows.list.push(WindowClient {
      id,
      url,
      focused: false,
      controlled: false,
    });
    Ok(id)
  }

  /// Snapshot of every window.
  pub fn windows(&self) -> Vec<WindowClient> {
    self
      .inner
      .lock()
      .map(|w| w.list.clone())
      .unwrap_or_default()
  }

  fn with_window<F>(&self, id: u64, f: F) -> Result<()>
  where
    F: FnOnce(&mut Windows, usize),
  {
    let mut windows = self.inner.lock().map_err(|e| eyre!("Lock poisoned: {}", e))?;
    let index = windows
      .list
      .iter()
      .position(|w| w.id == id)
      .ok_or_else(|| eyre!("No window with id {}", id))?;
    f(&mut *windows, index);
    Ok(())
  }
}

#[async_trait]
impl Clients for WindowRegistry {
  async fn match_all(&self, include_uncontrolled: bool) -> Result<Vec<WindowClient>> {
    Ok(
      self
        .windows()
        .into_iter()
        .filter(|w| include_uncontrolled || w.controlled)
        .collect(),
    )
  }

  async fn navigate(&self, id: u64, url: &Url) -> Result<()> {
    self.with_window(id, |windows, index| {
      windows.list[index].url = url.clone();
    })
  }

  async fn focus(&self, id: u64) -> Result<()> {
    self.with_window(id, |windows, index| {
      for (i, window) in windows.list.iter_mut().enumerate() {
        window.focused = i == index;
      }
    })
  }

  async fn open_window(&self, url: &Url) -> Result<u64> {
    let mut windows = self.inner.lock().map_err(|e| eyre!("Lock poisoned: {}", e))?;
    let id = windows.next_id;
    windows.next_id += 1;
    for window in windows.list.iter_mut() {
      window.focused = false;
    }
    windows.list.push(WindowClient {
      id,
      url: url.clone(),
      focused: true,
      controlled: true,
    });
    Ok(id)
  }

  async fn claim(&self) -> Result<usize> {
    let mut windows = self.inner.lock().map_err(|e| eyre!("Lock poisoned: {}", e))?;
    let mut claimed = 0;
    for window in windows.list.iter_mut().filter(|w| !w.controlled) {
      window.controlled = true;
      claimed += 1;
    }
    Ok(claimed)
  }
}
