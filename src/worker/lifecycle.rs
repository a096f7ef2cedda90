//! Install and activate handlers.

use color_eyre::{eyre::eyre, Result};
use futures::future::try_join_all;
use tracing::{info, warn};

use super::{Worker, WorkerState};
use crate::cache::CacheStorage;
use crate::http::{Request, Response};

/// Result of a successful install.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallReport {
  pub bucket: String,
  /// Number of manifest URLs stored
  pub cached: usize,
}

/// Result of a successful activation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivateReport {
  /// Stale buckets that were deleted
  pub purged: Vec<String>,
  /// Windows taken under control
  pub claimed: usize,
}

impl<S: CacheStorage> Worker<S> {
  /// Precache the manifest into the current bucket.
  ///
  /// All or nothing: if any manifest URL is unreachable or answers with a
  /// non-2xx status nothing is stored and the worker becomes redundant.
  /// On success the worker skips waiting and may be activated at once.
  pub async fn install(&self) -> Result<InstallReport> {
    self.set_state(WorkerState::Installing)?;

    match self.precache().await {
      Ok(cached) => {
        self.set_state(WorkerState::Installed)?;
        info!(bucket = %self.current_bucket(), cached, "Worker installed");
        Ok(InstallReport {
          bucket: self.current_bucket().to_string(),
          cached,
        })
      }
      Err(e) => {
        self.set_state(WorkerState::Redundant)?;
        warn!(bucket = %self.current_bucket(), "Install failed: {}", e);
        Err(e)
      }
    }
  }

  async fn precache(&self) -> Result<usize> {
    let bucket = self.current_bucket();
    self.storage.open(bucket)?;

    let requests = self
      .config
      .precache
      .iter()
      .map(|url| self.config.resolve(url).map(Request::get))
      .collect::<Result<Vec<_>>>()?;

    let responses =
      try_join_all(requests.iter().map(|request| self.fetch_for_precache(request))).await?;

    let entries: Vec<(Request, Response)> = requests.into_iter().zip(responses).collect();
    self.storage.put_all(bucket, &entries)?;

    Ok(entries.len())
  }

  async fn fetch_for_precache(&self, request: &Request) -> Result<Response> {
    let response = self.host.network.fetch(request).await?;
    if !response.ok() {
      return Err(eyre!(
        "Precache of {} failed with status {}",
        request.url,
        response.status
      ));
    }
    Ok(response)
  }

  /// Purge every bucket but the current one, then claim all open windows.
  pub async fn activate(&self) -> Result<ActivateReport> {
    let state = self.state();
    if state != WorkerState::Installed {
      return Err(eyre!("Cannot activate worker in state {:?}", state));
    }
    self.set_state(WorkerState::Activating)?;

    let report = match self.purge_and_claim().await {
      Ok(report) => report,
      Err(e) => {
        // Still installed; activation can be retried
        self.set_state(WorkerState::Installed)?;
        return Err(e);
      }
    };

    self.set_state(WorkerState::Activated)?;
    info!(
      bucket = %self.current_bucket(),
      purged = report.purged.len(),
      claimed = report.claimed,
      "Worker activated"
    );

    Ok(report)
  }

  async fn purge_and_claim(&self) -> Result<ActivateReport> {
    let current = self.current_bucket();
    let stale: Vec<String> = self
      .storage
      .keys()?
      .into_iter()
      .filter(|name| name != current)
      .collect();

    for name in &stale {
      self.storage.delete(name)?;
      info!(bucket = %name, "Deleted stale cache bucket");
    }

    let claimed = self.host.clients.claim().await?;

    Ok(ActivateReport {
      purged: stale,
      claimed,
    })
  }
}
