//! Notification click routing.

use color_eyre::Result;
use tracing::info;
use url::Url;

use super::Worker;
use crate::cache::CacheStorage;
use crate::notify::Notification;

/// What a notification click did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClickAction {
  /// An open window of this origin was navigated to the target and focused
  Focused { client: u64, url: Url },
  /// No window of this origin was open; a new one was opened
  Opened { client: u64, url: Url },
}

impl<S: CacheStorage> Worker<S> {
  /// Close the clicked notification and bring the application to its target URL,
  /// reusing the first open window of this origin when there is one.
  pub async fn handle_notification_click(&self, notification: &Notification) -> Result<ClickAction> {
    self.host.notifier.close(&notification.tag).await?;

    let target = self
      .config
      .resolve(notification.data.url.as_deref().unwrap_or("/"))?;

    let origin = self.config.origin_url()?;

    let windows = self.host.clients.match_all(true).await?;
    if let Some(window) = windows.iter().find(|w| w.same_origin(&origin)) {
      self.host.clients.navigate(window.id, &target).await?;
      self.host.clients.focus(window.id).await?;
      info!(client = window.id, url = %target, "Focused existing window");
      return Ok(ClickAction::Focused {
        client: window.id,
        url: target,
      });
    }

    let client = self.host.clients.open_window(&target).await?;
    info!(client, url = %target, "Opened new window");

    Ok(ClickAction::Opened {
      client,
      url: target,
    })
  }
}
