use clap::Subcommand;
use color_eyre::{eyre::eyre, Result};
use reqwest::Method;
use sst_worker::cache::CacheStorage;
use sst_worker::clients::WindowRegistry;
use sst_worker::http::Request;
use sst_worker::notify::NotificationTray;
use sst_worker::worker::{ClickAction, FetchOutcome, Worker};

#[derive(Subcommand, Debug)]
pub enum Command {
  /// Precache the manifest into the current bucket, then activate
  Install {
    /// Stop after install; leave stale buckets in place
    #[arg(long)]
    no_activate: bool,
  },

  /// Route a request through the caching policy and print the response body
  Fetch {
    /// Absolute URL, or path relative to the configured origin
    url: String,

    #[arg(short = 'X', long, default_value = "GET")]
    method: String,

    /// Request body
    #[arg(short, long)]
    data: Option<String>,
  },

  /// Show the notification a push message would produce
  Push {
    /// JSON payload with any of title, body, icon, badge, url
    payload: Option<String>,
  },

  /// Simulate a notification click against a set of open windows
  Click {
    /// Target URL carried by the notification
    #[arg(long, default_value = "/")]
    target: String,

    /// URL of an open window (repeatable)
    #[arg(long = "window")]
    windows: Vec<String>,
  },

  /// List cache buckets
  Caches,
}

pub async fn run<S: CacheStorage>(
  command: Command,
  worker: &Worker<S>,
  clients: &WindowRegistry,
  tray: &NotificationTray,
) -> Result<()> {
  match command {
    Command::Install { no_activate } => {
      let report = worker.install().await?;
      println!("Cached {} resources in {}", report.cached, report.bucket);

      if !no_activate {
        let report = worker.activate().await?;
        for bucket in &report.purged {
          println!("Deleted {}", bucket);
        }
      }
      Ok(())
    }

    Command::Fetch { url, method, data } => {
      let method = Method::from_bytes(method.to_uppercase().as_bytes())
        .map_err(|e| eyre!("Invalid method '{}': {}", method, e))?;
      let mut request = Request::new(method, worker.config().resolve(&url)?);
      if let Some(data) = data {
        request = request.with_body(data);
      }

      let (response, source) = match worker.handle_fetch(&request).await? {
        FetchOutcome::Respond(routed) => (routed.response, routed.source.to_string()),
        // Not intercepted: the request goes out untouched
        FetchOutcome::Passthrough => (
          worker.host().network.fetch(&request).await?,
          "passthrough".to_string(),
        ),
      };

      eprintln!("{} ({})", response.status, source);
      println!("{}", response.text());
      Ok(())
    }

    Command::Push { payload } => {
      let notification = worker
        .handle_push(payload.as_deref().map(str::as_bytes))
        .await?;
      println!("{}", serde_json::to_string_pretty(&notification)?);
      println!("{} notification(s) visible", tray.visible().len());
      Ok(())
    }

    Command::Click { target, windows } => {
      for window in &windows {
        clients.add(worker.config().resolve(window)?)?;
      }

      let notification = worker
        .handle_push(Some(serde_json::json!({ "url": target }).to_string().as_bytes()))
        .await?;

      match worker.handle_notification_click(&notification).await? {
        ClickAction::Focused { client, url } => println!("Focused window {} at {}", client, url),
        ClickAction::Opened { client, url } => println!("Opened window {} at {}", client, url),
      }
      Ok(())
    }

    Command::Caches => {
      let storage = worker.storage();
      for bucket in storage.keys()? {
        let marker = if bucket == worker.current_bucket() {
          "*"
        } else {
          " "
        };
        println!("{} {} ({} entries)", marker, bucket, storage.entry_count(&bucket)?);
      }
      Ok(())
    }
  }
}
