//! Bridge error types.

use thiserror::Error;

use crate::channel::ChannelError;
use crate::config::ConfigError;
use crate::media::ArtworkError;

/// Errors that stop the bridge from starting or serving.
#[derive(Debug, Error)]
pub enum BridgeError {
  #[error("Configuration error: {0}")]
  Config(#[from] ConfigError),

  #[error("Channel error: {0}")]
  Channel(#[from] ChannelError),

  #[error("Artwork client error: {0}")]
  Artwork(#[from] ArtworkError),
}
