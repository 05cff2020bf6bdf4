use std::sync::Arc;

mod bridge;
pub mod channel;
pub mod config;
mod error;
pub mod media;
pub mod session;

#[cfg(test)]
mod testing;

pub use bridge::MediaSessionBridge;
pub use config::BridgeConfig;
pub use error::BridgeError;

use channel::ChannelServer;
use media::HeadlessSurface;
use session::{AudioSessionRequest, HeadlessAudioSession};
use tokio_util::sync::CancellationToken;

fn level_from_env() -> bool {
  std::env::var_os("RUST_LOG").is_some()
}

/// Initialise the `log` backend at `level`. `RUST_LOG` overrides it.
///
/// Called before the config is read so config errors are logged too.
pub fn init_logging(level: log::LevelFilter) {
  let installed = env_logger::Builder::new()
    .filter_level(log::LevelFilter::Trace)
    .parse_default_env()
    .format_timestamp_millis()
    .try_init()
    .is_ok();
  if installed {
    set_log_level(level);
  }
}

/// Change the active level once the config is known. No-op under `RUST_LOG`.
pub fn set_log_level(level: log::LevelFilter) {
  if !level_from_env() {
    log::set_max_level(level);
  }
}

/// Run the headless bridge daemon until `shutdown` is cancelled.
///
/// With `console` set, transport events are read from stdin.
pub async fn run(config: BridgeConfig, console: bool, shutdown: CancellationToken) -> Result<(), BridgeError> {
  // Audio session failure is not fatal
  let audio_session = HeadlessAudioSession::new();
  session::activate(&audio_session, &AudioSessionRequest::playback(config.default_to_speaker));

  let surface = Arc::new(HeadlessSurface::new());
  let bridge = Arc::new(MediaSessionBridge::new(&config, surface)?);

  if console {
    let commands = bridge.remote_commands();
    let interval = config.skip_interval;
    let token = shutdown.clone();
    tokio::spawn(async move {
      let lines = media::spawn_line_reader(std::io::BufReader::new(std::io::stdin()));
      media::run_console(lines, commands, interval, token).await;
    });
  }

  let server = ChannelServer::new(&config.channel_name, config.socket_dir.as_deref());
  bridge.serve(&server, shutdown).await
}
