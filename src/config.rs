use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

/// Worker configuration.
///
/// Every key has a default, so an absent config file yields a worker that
/// behaves like the deployed one.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
  /// Origin the worker is registered for. Relative URLs resolve against it.
  pub origin: String,
  /// Name of the current cache bucket. Bumping it invalidates every older bucket.
  pub cache_version: String,
  /// URLs fetched and stored during install
  pub precache: Vec<String>,
  /// Message carried in the JSON body returned for offline API calls
  pub offline_message: String,
  /// Optional network timeout; unset means requests may hang indefinitely
  pub fetch_timeout_secs: Option<u64>,
  /// SQLite cache location (defaults to $XDG_DATA_HOME/sst-worker/cache.db)
  pub cache_path: Option<PathBuf>,
  pub notifications: NotificationDefaults,
}

/// Values used for any field a push payload leaves out.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NotificationDefaults {
  pub title: String,
  pub body: String,
  pub icon: String,
  pub badge: String,
  pub url: String,
  /// Category tag; a new notification replaces a visible one with the same tag
  pub tag: String,
  /// Vibration pattern in milliseconds (vibrate, pause, vibrate, ...)
  pub vibrate: Vec<u32>,
}

impl Default for Config {
  fn default() -> Self {
    Self {
      origin: "http://localhost:8000/".to_string(),
      cache_version: "sst-sena-v5".to_string(),
      precache: vec![
        "/".to_string(),
        "/static/css/design-system.css".to_string(),
        "/static/manifest.json".to_string(),
        "https://cdn.jsdelivr.net/npm/bootstrap@5.3.0/dist/css/bootstrap.min.css".to_string(),
        "https://cdn.jsdelivr.net/npm/bootstrap-icons@1.10.0/font/bootstrap-icons.css".to_string(),
        "https://cdn.jsdelivr.net/npm/bootstrap@5.3.0/dist/js/bootstrap.bundle.min.js".to_string(),
      ],
      offline_message: "Sin conexion".to_string(),
      fetch_timeout_secs: None,
      cache_path: None,
      notifications: NotificationDefaults::default(),
    }
  }
}

impl Default for NotificationDefaults {
  fn default() -> Self {
    Self {
      title: "SST SENA".to_string(),
      body: "Tienes una nueva notificacion".to_string(),
      icon: "/static/icons/icon-192.png".to_string(),
      badge: "/static/icons/icon-192.png".to_string(),
      url: "/".to_string(),
      tag: "sst-emergencia".to_string(),
      vibrate: vec![200, 100, 200],
    }
  }
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./sst-worker.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/sst-worker/config.yaml
  ///
  /// Falls back to defaults when no file is found.
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    match path {
      Some(p) => Self::load_from_path(&p),
      None => {
        tracing::debug!("No configuration file found, using defaults");
        Ok(Self::default())
      }
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("sst-worker.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("sst-worker").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::from_yaml(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  /// Parse configuration from a YAML document.
  pub fn from_yaml(contents: &str) -> Result<Self> {
    let config: Config = serde_yaml::from_str(contents)?;

    if config.cache_version.trim().is_empty() {
      return Err(eyre!("cache_version must not be empty"));
    }
    config.origin_url()?;

    Ok(config)
  }

  pub fn fetch_timeout(&self) -> Option<Duration> {
    self.fetch_timeout_secs.map(Duration::from_secs)
  }

  pub fn origin_url(&self) -> Result<Url> {
    Url::parse(&self.origin).map_err(|e| eyre!("Invalid origin '{}': {}", self.origin, e))
  }

  /// Resolve a possibly relative URL against the worker origin.
  pub fn resolve(&self, url: &str) -> Result<Url> {
    self
      .origin_url()?
      .join(url)
      .map_err(|e| eyre!("Invalid URL '{}': {}", url, e))
  }

  /// Path of the SQLite cache database.
  pub fn cache_db_path(&self) -> Result<PathBuf> {
    if let Some(path) = &self.cache_path {
      return Ok(path.clone());
    }

    let data_dir = dirs::data_dir()
      .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
      .ok_or_else(|| eyre!("Could not determine data directory"))?;

    Ok(data_dir.join("sst-worker").join("cache.db"))
  }
}
