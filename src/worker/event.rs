//! Event dispatch from the host to the worker handlers.

use color_eyre::Result;

use super::{ActivateReport, ClickAction, FetchOutcome, InstallReport, Worker};
use crate::cache::CacheStorage;
use crate::http::Request;
use crate::notify::Notification;

/// Events the host delivers to the worker
#[derive(Debug)]
pub enum WorkerEvent {
  /// A new version was registered
  Install,
  /// Install succeeded; take over from the previous version
  Activate,
  /// A page issued a request
  Fetch(Request),
  /// A push message arrived, with its raw data if any
  Push(Option<Vec<u8>>),
  /// The user clicked a notification
  NotificationClick(Notification),
}

/// Result of handling one event
#[derive(Debug)]
pub enum WorkerOutcome {
  Installed(InstallReport),
  Activated(ActivateReport),
  Fetched(FetchOutcome),
  Shown(Notification),
  Clicked(ClickAction),
}

impl<S: CacheStorage> Worker<S> {
  /// Run the handler for `event` to completion.
  pub async fn dispatch(&self, event: WorkerEvent) -> Result<WorkerOutcome> {
    match event {
      WorkerEvent::Install => self.install().await.map(WorkerOutcome::Installed),
      WorkerEvent::Activate => self.activate().await.map(WorkerOutcome::Activated),
      WorkerEvent::Fetch(request) => self
        .handle_fetch(&request)
        .await
        .map(WorkerOutcome::Fetched),
      WorkerEvent::Push(data) => self
        .handle_push(data.as_deref())
        .await
        .map(WorkerOutcome::Shown),
      WorkerEvent::NotificationClick(notification) => self
        .handle_notification_click(&notification)
        .await
        .map(WorkerOutcome::Clicked),
    }
  }
}
