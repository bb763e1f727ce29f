use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use url::Url;

pub const DEFAULT_CACHE_NAME: &str = "FDX cache";
pub const DEFAULT_ICON: &str = "/static/icon_144x144.png";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
  /// Origin the worker is registered for (e.g. "https://chat.example.com")
  pub origin: Url,
  /// Notification title
  #[serde(default = "default_product_name")]
  pub product_name: String,
  #[serde(default)]
  pub cache: CacheConfig,
  #[serde(default)]
  pub notifications: NotificationConfig,
}

fn default_product_name() -> String {
  "RemoTalk".to_string()
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
  /// Name of the single cache store the worker writes to
  pub name: String,
  /// Only same-origin GETs under this path prefix are cached
  pub static_prefix: String,
  /// Never cache `.js` paths
  pub exclude_scripts: bool,
  /// Assets fetched into the cache right after install
  pub prewarm: Vec<String>,
  /// SQLite file (default: $XDG_DATA_HOME/remotalk-sw/cache.db)
  pub path: Option<PathBuf>,
  /// Keep the cache in memory only
  pub in_memory: bool,
}

impl Default for CacheConfig {
  fn default() -> Self {
    Self {
      name: DEFAULT_CACHE_NAME.to_string(),
      static_prefix: "/static".to_string(),
      exclude_scripts: true,
      prewarm: vec![DEFAULT_ICON.to_string()],
      path: None,
      in_memory: false,
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NotificationConfig {
  pub default_icon: String,
  /// Body of the notification shown for a new message
  pub message_body: String,
  /// Body of the notification shown when the session expired
  pub session_body: String,
  pub login_path: String,
}

impl Default for NotificationConfig {
  fn default() -> Self {
    Self {
      default_icon: DEFAULT_ICON.to_string(),
      message_body: "新規メッセージを受信しました。".to_string(),
      session_body: "セッション有効期限切れ".to_string(),
      login_path: "/login".to_string(),
    }
  }
}

impl Config {
  /// Configuration with every field at its default, for the given origin.
  pub fn for_origin(origin: Url) -> Self {
    Self {
      origin,
      product_name: default_product_name(),
      cache: CacheConfig::default(),
      notifications: NotificationConfig::default(),
    }
  }

  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./remotalk-sw.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/remotalk-sw/config.yaml
  ///
  /// When nothing is found and `origin` is given, defaults are used.
  pub fn load(explicit_path: Option<&Path>, origin: Option<Url>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    match (path, origin) {
      (Some(p), origin) => {
        let mut config = Self::load_from_path(&p)?;
        if let Some(origin) = origin {
          config.origin = origin;
        }
        Ok(config)
      }
      (None, Some(origin)) => Ok(Self::for_origin(origin)),
      (None, None) => Err(eyre!(
        "No configuration file found. Create one at ~/.config/remotalk-sw/config.yaml \
         or pass --origin."
      )),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from("remotalk-sw.yaml");
    if local.exists() {
      return Some(local);
    }

    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("remotalk-sw").join("config.yaml");
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

  pub fn from_yaml(contents: &str) -> Result<Self> {
    let config: Config = serde_yaml::from_str(contents)?;
    Ok(config)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_minimal_config_uses_defaults() {
    let config = Config::from_yaml("origin: https://chat.example.com\n").unwrap();
    assert_eq!(config.product_name, "RemoTalk");
    assert_eq!(config.cache.name, DEFAULT_CACHE_NAME);
    assert_eq!(config.cache.static_prefix, "/static");
    assert!(config.cache.exclude_scripts);
    assert_eq!(config.notifications.login_path, "/login");
  }

  #[test]
  fn test_partial_section_keeps_other_defaults() {
    let yaml = "origin: https://chat.example.com\ncache:\n  exclude_scripts: false\n  prewarm: []\n";
    let config = Config::from_yaml(yaml).unwrap();
    assert!(!config.cache.exclude_scripts);
    assert!(config.cache.prewarm.is_empty());
    assert_eq!(config.cache.name, DEFAULT_CACHE_NAME);
  }

  #[test]
  fn test_missing_origin_is_an_error() {
    assert!(Config::from_yaml("product_name: Chat\n").is_err());
  }
}
