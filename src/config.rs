//! Bridge configuration with file persistence.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Channel identifier the app layer connects to.
pub const DEFAULT_CHANNEL_NAME: &str = "com.example.kconnectMobile/audio";

const CONFIG_DIR_NAME: &str = "kconnect-audio-bridge";
const CONFIG_FILE_NAME: &str = "config.json";

#[derive(Error, Debug)]
pub enum ConfigError {
  #[error("Failed to read config file: {0}")]
  Read(#[from] std::io::Error),
  #[error("Malformed config file: {0}")]
  Parse(#[from] serde_json::Error),
  #[error("Invalid config: {0}")]
  Invalid(String),
}

/// Bridge configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BridgeConfig {
  /// Named channel shared with the app layer.
  #[serde(default = "default_channel_name")]
  pub channel_name: String,

  /// Directory for the channel socket (None = system temp dir). Ignored on Windows.
  #[serde(default)]
  pub socket_dir: Option<PathBuf>,

  /// Preferred skip forward/backward interval in seconds.
  #[serde(default = "default_skip_interval")]
  pub skip_interval: u32,

  /// Artwork fetch timeout in seconds (None = no timeout).
  #[serde(default)]
  pub artwork_timeout: Option<u32>,

  /// Route playback to the built-in speaker when no other route is chosen.
  #[serde(default = "default_to_speaker")]
  pub default_to_speaker: bool,

  /// Report play/pause/toggle/next/previous as failed when the app is not connected.
  #[serde(default)]
  pub strict_delivery: bool,

  /// Log level (error, warn, info, debug, trace, off).
  #[serde(default = "default_log_level")]
  pub log_level: String,
}

fn default_channel_name() -> String {
  DEFAULT_CHANNEL_NAME.to_string()
}

fn default_skip_interval() -> u32 {
  15
}

fn default_to_speaker() -> bool {
  true
}

fn default_log_level() -> String {
  "info".to_string()
}

impl Default for BridgeConfig {
  fn default() -> Self {
    Self {
      channel_name: default_channel_name(),
      socket_dir: None,
      skip_interval: default_skip_interval(),
      artwork_timeout: None,
      default_to_speaker: default_to_speaker(),
      strict_delivery: false,
      log_level: default_log_level(),
    }
  }
}

impl BridgeConfig {
  /// Default config file location under the user config dir.
  pub fn default_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
  }

  /// Load config from `path`, falling back to defaults when the file does not exist.
  pub fn load(path: &Path) -> Result<Self, ConfigError> {
    let config = match std::fs::read_to_string(path) {
      Ok(text) => {
        log::info!("Loading config from {}", path.display());
        serde_json::from_str::<BridgeConfig>(&text)?
      }
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
        log::info!("No config at {}, using defaults", path.display());
        BridgeConfig::default()
      }
      Err(e) => return Err(e.into()),
    };

    config.validate().map_err(ConfigError::Invalid)?;
    Ok(config)
  }

  /// Validate configuration values.
  pub fn validate(&self) -> Result<(), String> {
    if self.channel_name.trim().is_empty() {
      return Err("Channel name cannot be empty".to_string());
    }
    if self.skip_interval < 1 || self.skip_interval > 300 {
      return Err("Skip interval must be between 1 and 300 seconds".to_string());
    }
    if let Some(timeout) = self.artwork_timeout {
      if timeout < 1 || timeout > 300 {
        return Err("Artwork timeout must be between 1 and 300 seconds".to_string());
      }
    }
    if self.log_level.parse::<log::LevelFilter>().is_err() {
      return Err(format!("Unknown log level: {}", self.log_level));
    }
    Ok(())
  }

  /// Parsed log level, `Info` if unparseable.
  pub fn log_filter(&self) -> log::LevelFilter {
    self.log_level.parse().unwrap_or(log::LevelFilter::Info)
  }
}
