mod commands;

use clap::Parser;
use color_eyre::Result;
use sst_worker::cache::{MemoryStorage, SqliteStorage};
use sst_worker::clients::WindowRegistry;
use sst_worker::config::Config;
use sst_worker::network::HttpNetwork;
use sst_worker::notify::NotificationTray;
use sst_worker::worker::{Host, Worker};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use commands::Command;

#[derive(Parser, Debug)]
#[command(name = "sst-worker")]
#[command(about = "Offline cache and notification worker for the SST SENA web application")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/sst-worker/config.yaml)
  #[arg(short, long, global = true)]
  config: Option<PathBuf>,

  /// Increase log verbosity (-v debug, -vv trace)
  #[arg(short, long, action = clap::ArgAction::Count, global = true)]
  verbose: u8,

  /// Keep the cache in memory instead of the SQLite database
  #[arg(long, global = true)]
  ephemeral: bool,

  #[command(subcommand)]
  command: Command,
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  // SST_WORKER_LOG overrides the verbosity flag
  let filter = EnvFilter::try_from_env("SST_WORKER_LOG").unwrap_or_else(|_| match args.verbose {
    0 => EnvFilter::new("sst_worker=info"),
    1 => EnvFilter::new("sst_worker=debug"),
    _ => EnvFilter::new("sst_worker=trace"),
  });
  let (writer, _guard) = tracing_appender::non_blocking(std::io::stderr());
  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(writer)
    .with_target(false)
    .init();

  let config = Config::load(args.config.as_deref())?;

  let clients = Arc::new(WindowRegistry::new());
  let tray = Arc::new(NotificationTray::new());
  let host = Host {
    network: Arc::new(HttpNetwork::new(&config)?),
    clients: clients.clone(),
    notifier: tray.clone(),
  };

  if args.ephemeral {
    let worker = Worker::new(config, MemoryStorage::new(), host);
    commands::run(args.command, &worker, &clients, &tray).await
  } else {
    let storage = SqliteStorage::open_at(&config.cache_db_path()?)?;
    let worker = Worker::new(config, storage, host);
    commands::run(args.command, &worker, &clients, &tray).await
  }
}
