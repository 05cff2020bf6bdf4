use std::path::PathBuf;

use audio_bridge::{BridgeConfig, BridgeError};
use clap::Parser;
use tokio_util::sync::CancellationToken;

/// Media-session bridge between the kconnect app layer and system media controls.
#[derive(Parser, Debug)]
#[command(name = "kconnect-audio-bridge", version, about)]
struct Cli {
  /// Config file (default: <config dir>/kconnect-audio-bridge/config.json)
  #[arg(long)]
  config: Option<PathBuf>,

  /// Named channel identifier
  #[arg(long)]
  channel: Option<String>,

  /// Directory for the channel socket
  #[arg(long)]
  socket_dir: Option<PathBuf>,

  /// Log level (error, warn, info, debug, trace)
  #[arg(long)]
  log_level: Option<String>,

  /// Read transport events (play, pause, seek 12.5, ...) from stdin
  #[arg(long)]
  console: bool,
}

#[tokio::main]
async fn main() -> Result<(), BridgeError> {
  let cli = Cli::parse();

  // Level from the flag for now; the config may change it below
  let cli_level = cli.log_level.as_deref().and_then(|level| level.parse().ok());
  audio_bridge::init_logging(cli_level.unwrap_or(log::LevelFilter::Info));

  let mut config = match cli.config.or_else(BridgeConfig::default_path) {
    Some(path) => BridgeConfig::load(&path)?,
    None => BridgeConfig::default(),
  };
  if let Some(channel) = cli.channel {
    config.channel_name = channel;
  }
  if let Some(dir) = cli.socket_dir {
    config.socket_dir = Some(dir);
  }
  if let Some(level) = cli.log_level {
    config.log_level = level;
  }
  config
    .validate()
    .map_err(|e| BridgeError::Config(audio_bridge::config::ConfigError::Invalid(e)))?;

  audio_bridge::set_log_level(config.log_filter());
  log::info!("Starting bridge on channel {}", config.channel_name);

  let shutdown = CancellationToken::new();
  let signal_token = shutdown.clone();
  tokio::spawn(async move {
    if let Err(e) = tokio::signal::ctrl_c().await {
      log::error!("Failed to listen for Ctrl-C: {}", e);
      return;
    }
    log::info!("Shutdown requested");
    signal_token.cancel();
  });

  audio_bridge::run(config, cli.console, shutdown).await
}
