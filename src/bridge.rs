//! Media-session bridge - routes app calls to the system surface and system events to the app.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::channel::{AppChannel, BridgeMethod, ChannelServer, MethodCall, MethodHandler, MethodResponse};
use crate::config::BridgeConfig;
use crate::error::BridgeError;
use crate::media::{
  ArtworkFetcher, CommandAvailability, CommandStatus, NowPlayingInfo, NowPlayingPublisher,
  NowPlayingSurface, RemoteCommandCenter, RemoteEvent,
};

/// Bridge between the app layer and the system media surface.
pub struct MediaSessionBridge {
  publisher: NowPlayingPublisher,
  commands: Arc<RemoteCommandCenter>,
  app: Arc<AppChannel>,
}

impl MediaSessionBridge {
  /// Create a bridge publishing to `surface`. Registers every transport control.
  pub fn new(config: &BridgeConfig, surface: Arc<dyn NowPlayingSurface>) -> Result<Self, BridgeError> {
    let fetcher = ArtworkFetcher::new(config.artwork_timeout.map(|s| Duration::from_secs(s as u64)))?;
    let app = Arc::new(AppChannel::new());
    let commands = Arc::new(RemoteCommandCenter::new(
      app.clone(),
      surface.clone(),
      config.skip_interval,
      config.strict_delivery,
    ));

    Ok(Self {
      publisher: NowPlayingPublisher::new(surface, Arc::new(fetcher)),
      commands,
      app,
    })
  }

  /// Push now-playing metadata. Returns the artwork task if one was started.
  pub fn update_now_playing(&self, info: NowPlayingInfo) -> Option<JoinHandle<()>> {
    log::debug!("updateNowPlaying: {:?}", info);
    self.publisher.update(info)
  }

  /// Enable or disable next/previous track controls.
  pub fn update_command_availability(&self, availability: CommandAvailability) {
    log::debug!("updateCommandAvailability: {:?}", availability);
    self.commands.update_availability(availability);
  }

  /// Handle an event from the system transport surface.
  pub fn handle_remote_event(&self, event: RemoteEvent) -> CommandStatus {
    self.commands.dispatch(event)
  }

  pub fn remote_commands(&self) -> Arc<RemoteCommandCenter> {
    self.commands.clone()
  }

  pub fn app_channel(&self) -> Arc<AppChannel> {
    self.app.clone()
  }

  /// Serve the named channel until `shutdown` is cancelled.
  pub async fn serve(self: Arc<Self>, server: &ChannelServer, shutdown: CancellationToken) -> Result<(), BridgeError> {
    let app = self.app.clone();
    server.serve(self, app, shutdown).await?;
    Ok(())
  }
}

impl MethodHandler for MediaSessionBridge {
  fn handle_call(&self, call: MethodCall) -> MethodResponse {
    match call.decode() {
      Ok(BridgeMethod::UpdateNowPlaying(info)) => {
        self.update_now_playing(info);
        MethodResponse::success(call.id)
      }
      Ok(BridgeMethod::UpdateCommandAvailability(availability)) => {
        self.update_command_availability(availability);
        MethodResponse::success(call.id)
      }
      Ok(BridgeMethod::Unknown(method)) => {
        log::warn!("Unhandled channel method: {}", method);
        MethodResponse::not_implemented(call.id, &method)
      }
      Err(e) => {
        log::warn!("Bad arguments for {}: {}", call.method, e);
        MethodResponse::bad_arguments(call.id, e.to_string())
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::channel::ErrorCode;
  use crate::media::RemoteCommand;
  use crate::testing::{write_png, RecordingSurface};

  fn bridge() -> (MediaSessionBridge, Arc<RecordingSurface>) {
    let surface = Arc::new(RecordingSurface::default());
    let bridge = MediaSessionBridge::new(&BridgeConfig::default(), surface.clone()).unwrap();
    (bridge, surface)
  }

  fn call(json: serde_json::Value) -> MethodCall {
    serde_json::from_value(json).unwrap()
  }

  #[tokio::test]
  async fn update_now_playing_call_publishes() {
    let (bridge, surface) = bridge();
    let response = bridge.handle_call(call(serde_json::json!({
      "id": 1,
      "method": "updateNowPlaying",
      "arguments": {"title": "T", "artist": "A", "duration": 60000, "position": 30000, "isPlaying": false}
    })));

    assert!(response.is_success());
    assert_eq!(response.id, Some(1));
    let record = surface.last().unwrap();
    assert_eq!(record.duration, 60.0);
    assert_eq!(record.elapsed, 30.0);
    assert_eq!(record.playback_rate, 0.0);
  }

  #[tokio::test]
  async fn artwork_arrives_in_second_publish() {
    let dir = tempfile::tempdir().unwrap();
    let url = write_png(dir.path(), "cover.png", 12, 10);
    let (bridge, surface) = bridge();

    let handle = bridge
      .update_now_playing(NowPlayingInfo {
        title: "T".into(),
        artwork_url: Some(url),
        ..Default::default()
      })
      .unwrap();
    handle.await.unwrap();

    let records = surface.records();
    assert_eq!(records.len(), 2);
    assert!(records[0].artwork.is_none());
    assert_eq!(records[1].artwork.as_ref().map(|a| (a.width(), a.height())), Some((12, 10)));
  }

  #[test]
  fn availability_call_toggles_controls() {
    let (bridge, surface) = bridge();
    let response = bridge.handle_call(call(serde_json::json!({
      "id": 2,
      "method": "updateCommandAvailability",
      "arguments": {"canGoNext": false, "canGoPrevious": true}
    })));

    assert!(response.is_success());
    assert_eq!(surface.enabled(RemoteCommand::NextTrack), Some(false));
    assert_eq!(surface.enabled(RemoteCommand::PreviousTrack), Some(true));
  }

  #[test]
  fn unknown_method_is_not_implemented() {
    let (bridge, surface) = bridge();
    let published_before = surface.records().len();

    let response = bridge.handle_call(call(serde_json::json!({"id": 3, "method": "shuffle"})));
    assert_eq!(response.error.unwrap().code, ErrorCode::NotImplemented);
    assert_eq!(surface.records().len(), published_before);
    assert_eq!(surface.enabled(RemoteCommand::NextTrack), Some(true));
  }

  #[test]
  fn bad_arguments_change_nothing() {
    let (bridge, surface) = bridge();
    let response = bridge.handle_call(call(serde_json::json!({
      "id": 4,
      "method": "updateNowPlaying",
      "arguments": "not a map"
    })));

    assert_eq!(response.error.unwrap().code, ErrorCode::BadArguments);
    assert!(surface.records().is_empty());
  }

  #[test]
  fn remote_events_without_app_connection() {
    let (bridge, _) = bridge();
    assert!(!bridge.app_channel().is_connected());
    assert_eq!(bridge.handle_remote_event(RemoteEvent::new(RemoteCommand::Play)), CommandStatus::Success);
    assert_eq!(bridge.handle_remote_event(RemoteEvent::skip_forward(15.0)), CommandStatus::CommandFailed);
  }
}
