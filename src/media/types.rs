//! Media session types.
//!
//! Inbound payloads mirror what the app layer sends over the channel;
//! `NowPlayingRecord` is what the system display ends up holding.

use std::fmt;
use std::sync::Arc;

use image::RgbaImage;
use serde::{Deserialize, Serialize};

/// Now-playing metadata pushed by the app layer.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NowPlayingInfo {
  #[serde(default)]
  pub title: String,
  #[serde(default)]
  pub artist: String,
  /// Track length in milliseconds.
  #[serde(default, rename = "duration")]
  pub duration_ms: u64,
  /// Elapsed time in milliseconds.
  #[serde(default, rename = "position")]
  pub position_ms: u64,
  #[serde(default)]
  pub is_playing: bool,
  #[serde(default, rename = "artwork")]
  pub artwork_url: Option<String>,
}

impl NowPlayingInfo {
  /// Artwork URL, treating an empty string as absent.
  pub fn artwork(&self) -> Option<&str> {
    self
      .artwork_url
      .as_deref()
      .map(str::trim)
      .filter(|url| !url.is_empty())
  }
}

/// Which transport buttons the system surface enables.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandAvailability {
  #[serde(default)]
  pub can_go_next: bool,
  #[serde(default)]
  pub can_go_previous: bool,
}

/// Decoded artwork bound at its native pixel size.
#[derive(Clone, PartialEq)]
pub struct Artwork {
  image: Arc<RgbaImage>,
}

impl Artwork {
  pub fn new(image: RgbaImage) -> Self {
    Self {
      image: Arc::new(image),
    }
  }

  pub fn width(&self) -> u32 {
    self.image.width()
  }

  pub fn height(&self) -> u32 {
    self.image.height()
  }

  pub fn image(&self) -> &RgbaImage {
    &self.image
  }
}

impl fmt::Debug for Artwork {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "Artwork({}x{})", self.width(), self.height())
  }
}

/// Metadata record held by the system now-playing display.
#[derive(Debug, Clone, PartialEq)]
pub struct NowPlayingRecord {
  pub title: String,
  pub artist: String,
  /// Seconds.
  pub duration: f64,
  /// Seconds.
  pub elapsed: f64,
  /// 1.0 while playing, 0.0 otherwise.
  pub playback_rate: f64,
  pub artwork: Option<Artwork>,
}

impl NowPlayingRecord {
  /// Build the text-only record for `info`.
  pub fn from_info(info: &NowPlayingInfo) -> Self {
    Self {
      title: info.title.clone(),
      artist: info.artist.clone(),
      duration: info.duration_ms as f64 / 1000.0,
      elapsed: info.position_ms as f64 / 1000.0,
      playback_rate: if info.is_playing { 1.0 } else { 0.0 },
      artwork: None,
    }
  }

  pub fn with_artwork(mut self, artwork: Artwork) -> Self {
    self.artwork = Some(artwork);
    self
  }
}

/// Transport control on the system surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RemoteCommand {
  Play,
  Pause,
  TogglePlayPause,
  NextTrack,
  PreviousTrack,
  SkipForward,
  SkipBackward,
  ChangePlaybackPosition,
}

impl RemoteCommand {
  /// Every control the bridge registers a handler for.
  pub const ALL: [RemoteCommand; 8] = [
    RemoteCommand::Play,
    RemoteCommand::Pause,
    RemoteCommand::TogglePlayPause,
    RemoteCommand::NextTrack,
    RemoteCommand::PreviousTrack,
    RemoteCommand::SkipForward,
    RemoteCommand::SkipBackward,
    RemoteCommand::ChangePlaybackPosition,
  ];
}

/// Payload attached to a system event. Its type depends on the control.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EventPayload {
  None,
  /// Skip interval in seconds.
  SkipInterval(f64),
  /// Absolute position in seconds.
  PlaybackPosition(f64),
}

/// Event delivered by the system transport surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RemoteEvent {
  pub command: RemoteCommand,
  pub payload: EventPayload,
}

impl RemoteEvent {
  pub fn new(command: RemoteCommand) -> Self {
    Self {
      command,
      payload: EventPayload::None,
    }
  }

  pub fn skip_forward(seconds: f64) -> Self {
    Self {
      command: RemoteCommand::SkipForward,
      payload: EventPayload::SkipInterval(seconds),
    }
  }

  pub fn skip_backward(seconds: f64) -> Self {
    Self {
      command: RemoteCommand::SkipBackward,
      payload: EventPayload::SkipInterval(seconds),
    }
  }

  pub fn change_position(seconds: f64) -> Self {
    Self {
      command: RemoteCommand::ChangePlaybackPosition,
      payload: EventPayload::PlaybackPosition(seconds),
    }
  }
}

/// Result reported back to the system surface for an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandStatus {
  Success,
  CommandFailed,
  /// The app layer disabled this control.
  CommandDisabled,
}

/// Command forwarded to the app layer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TransportCommand {
  Play,
  Pause,
  Toggle,
  Next,
  Previous,
  /// Seconds.
  SeekForward(f64),
  /// Seconds.
  SeekBackward(f64),
  /// Milliseconds.
  SeekTo(i64),
}

impl TransportCommand {
  /// Method name invoked on the app channel.
  pub fn method(&self) -> &'static str {
    match self {
      TransportCommand::Play => "resume",
      TransportCommand::Pause => "pause",
      TransportCommand::Toggle => "toggle",
      TransportCommand::Next => "handleNextTrack",
      TransportCommand::Previous => "handlePreviousTrack",
      TransportCommand::SeekForward(_) => "seekForward",
      TransportCommand::SeekBackward(_) => "seekBackward",
      TransportCommand::SeekTo(_) => "seekTo",
    }
  }

  /// Method argument, `Null` for commands without one.
  pub fn arguments(&self) -> serde_json::Value {
    match self {
      TransportCommand::SeekForward(seconds) | TransportCommand::SeekBackward(seconds) => {
        (*seconds).into()
      }
      TransportCommand::SeekTo(ms) => (*ms).into(),
      _ => serde_json::Value::Null,
    }
  }

  /// Seek commands fail the system event when they cannot be delivered.
  pub fn requires_delivery(&self) -> bool {
    matches!(
      self,
      TransportCommand::SeekForward(_) | TransportCommand::SeekBackward(_) | TransportCommand::SeekTo(_)
    )
  }
}
