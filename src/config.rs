//! Client configuration and YAML loading.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::GeocodeError;

/// Default upstream endpoint, the public Nominatim instance.
pub const DEFAULT_BASE_URL: &str = "https://nominatim.openstreetmap.org";

/// Client configuration.
///
/// Every field has a default, so any subset may be given in the config
/// file or overridden with struct-update syntax.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
  /// Upstream root URL.
  pub base_url: String,
  /// Value of the `accept-language` query parameter.
  pub language: String,
  /// Ask upstream for the address component breakdown.
  pub address_details: bool,
  /// Ask upstream for free-form object tags.
  pub extra_tags: bool,
  /// Ask upstream for multilingual name variants.
  pub name_details: bool,
  /// `User-Agent` header; the public instance requires an identifying one.
  pub user_agent: String,
  /// Request timeout in milliseconds.
  pub timeout_ms: u64,
  pub cache: CacheConfig,
}

impl Default for Config {
  fn default() -> Self {
    Self {
      base_url: DEFAULT_BASE_URL.to_string(),
      language: "en".to_string(),
      address_details: true,
      extra_tags: false,
      name_details: false,
      user_agent: concat!("nominatim-client/", env!("CARGO_PKG_VERSION")).to_string(),
      timeout_ms: 5_000,
      cache: CacheConfig::default(),
    }
  }
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./nominatim.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/nominatim/config.yaml
  ///
  /// Falls back to the defaults when no file exists anywhere.
  pub fn load(explicit_path: Option<&Path>) -> Result<Self, GeocodeError> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(GeocodeError::Config(format!(
          "config file not found: {}",
          p.display()
        )));
      }
    } else {
      Self::find_config_file()
    };

    match path {
      Some(p) => Self::load_from_path(&p),
      None => Ok(Self::default()),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("nominatim.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("nominatim").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self, GeocodeError> {
    let contents = std::fs::read_to_string(path).map_err(|e| {
      GeocodeError::Config(format!("failed to read config file {}: {}", path.display(), e))
    })?;

    serde_yaml::from_str(&contents).map_err(|e| {
      GeocodeError::Config(format!(
        "failed to parse config file {}: {}",
        path.display(),
        e
      ))
    })
  }

  /// Request timeout as a [`Duration`].
  pub fn timeout(&self) -> Duration {
    Duration::from_millis(self.timeout_ms)
  }
}

/// Cache configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
  /// Default entry lifetime in milliseconds. One day unless overridden.
  pub ttl_ms: u64,
  /// Store scope name; the SQLite backend keeps its database under it.
  /// Logical keys are not prefixed with it.
  pub namespace: String,
  /// Entries hit within this many milliseconds of their expiry are
  /// refreshed in the background.
  pub refresh_threshold_ms: u64,
  /// Spawn cache writes instead of awaiting them.
  pub non_blocking: bool,
  /// Which backend to use.
  pub store: StoreKind,
}

impl Default for CacheConfig {
  fn default() -> Self {
    Self {
      ttl_ms: 86_400_000,
      namespace: "nominatim".to_string(),
      refresh_threshold_ms: 60_000,
      non_blocking: false,
      store: StoreKind::Memory,
    }
  }
}

impl CacheConfig {
  /// Default entry lifetime as a [`Duration`].
  pub fn ttl(&self) -> Duration {
    Duration::from_millis(self.ttl_ms)
  }

  /// Background refresh window as a [`Duration`].
  pub fn refresh_threshold(&self) -> Duration {
    Duration::from_millis(self.refresh_threshold_ms)
  }
}

/// Cache backend selection.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
  /// Process-local in-memory store
  #[default]
  Memory,
  /// SQLite-backed store that survives restarts
  Sqlite,
  /// Caching disabled
  None,
}
