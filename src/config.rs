use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;
use url::Url;

use crate::query::QueryConfig;

pub const DEFAULT_BASE_URL: &str = "https://jsonplaceholder.typicode.com";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
  pub api: ApiConfig,
  pub query: QuerySettings,
  pub ui: UiConfig,
  pub log: LogConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
  /// Root of the posts API; `/posts` and `/posts/{id}` are appended
  pub base_url: String,
}

impl Default for ApiConfig {
  fn default() -> Self {
    Self {
      base_url: DEFAULT_BASE_URL.to_string(),
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct QuerySettings {
  /// Cached data older than this is refetched in the background.
  /// 0 means every re-visit triggers a background refresh.
  pub stale_time_ms: u64,
  /// Unobserved queries are dropped after this long
  pub gc_time_secs: u64,
}

impl Default for QuerySettings {
  fn default() -> Self {
    Self {
      stale_time_ms: 0,
      gc_time_secs: 5 * 60,
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UiConfig {
  pub tick_rate_ms: u64,
  /// Show the query devtools panel on startup
  pub devtools_open: bool,
}

impl Default for UiConfig {
  fn default() -> Self {
    Self {
      tick_rate_ms: 250,
      devtools_open: true,
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LogConfig {
  /// Filter used when RUST_LOG is not set
  pub level: String,
  /// Log directory (default: $XDG_DATA_HOME/postq)
  pub directory: Option<PathBuf>,
}

impl Default for LogConfig {
  fn default() -> Self {
    Self {
      level: "info".to_string(),
      directory: None,
    }
  }
}

impl Config {
  /// Load configuration.
  ///
  /// Search order:
  /// 1. Explicit path if provided (must exist)
  /// 2. ./postq.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/postq/config.yaml
  ///
  /// Falls back to built-in defaults when no file is found.
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
        debug!("no config file found, using defaults");
        Ok(Self::default())
      }
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from("postq.yaml");
    if local.exists() {
      return Some(local);
    }

    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("postq").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    let config: Config = serde_yaml::from_str(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))?;

    config.validate()?;
    Ok(config)
  }

  /// Check values that serde cannot.
  pub fn validate(&self) -> Result<()> {
    let url = Url::parse(&self.api.base_url)
      .map_err(|e| eyre!("Invalid api.base_url {:?}: {}", self.api.base_url, e))?;

    match url.scheme() {
      "http" | "https" => Ok(()),
      other => Err(eyre!(
        "Invalid api.base_url {:?}: unsupported scheme {}",
        self.api.base_url,
        other
      )),
    }
  }

  pub fn query_config(&self) -> QueryConfig {
    QueryConfig {
      stale_time: Duration::from_millis(self.query.stale_time_ms),
      gc_time: Duration::from_secs(self.query.gc_time_secs),
    }
  }

  pub fn tick_rate(&self) -> Duration {
    Duration::from_millis(self.ui.tick_rate_ms)
  }
}
