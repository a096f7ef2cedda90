//! Notifications shown by the worker.

use async_trait::async_trait;
use color_eyre::{eyre::eyre, Result};
use serde::Serialize;
use std::sync::Mutex;

/// Data attached to a notification for use when it is clicked.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NotificationData {
  pub url: Option<String>,
}

/// A notification as handed to the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
  pub title: String,
  pub body: String,
  pub icon: String,
  pub badge: String,
  /// Category tag; showing a notification replaces any visible one with the same tag
  pub tag: String,
  /// Stay on screen until the user acts on it
  pub require_interaction: bool,
  pub vibrate: Vec<u32>,
  pub data: NotificationData,
}

/// Host facility for displaying notifications.
#[async_trait]
pub trait Notifier: Send + Sync {
  async fn show(&self, notification: Notification) -> Result<()>;

  /// Dismiss the visible notification carrying `tag`, if any.
  async fn close(&self, tag: &str) -> Result<()>;
}

/// Notification tray held in memory.
#[derive(Debug, Default)]
pub struct NotificationTray {
  visible: Mutex<Vec<Notification>>,
}

impl NotificationTray {
  pub fn new() -> Self {
    Self::default()
  }

  /// Notifications currently on screen, oldest first.
  pub fn visible(&self) -> Vec<Notification> {
    self
      .visible
      .lock()
      .map(|v| v.clone())
      .unwrap_or_default()
  }
}

#[async_trait]
impl Notifier for NotificationTray {
  async fn show(&self, notification: Notification) -> Result<()> {
    let mut visible = self
      .visible
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;
    visible.retain(|n| n.tag != notification.tag);
    visible.push(notification);
    Ok(())
  }

  async fn close(&self, tag: &str) -> Result<()> {
    let mut visible = self
      .visible
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;
    visible.retain(|n| n.tag != tag);
    Ok(())
  }
}
