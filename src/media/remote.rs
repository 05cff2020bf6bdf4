//! Remote command dispatch: system transport events to app commands.

use std::sync::Arc;

use parking_lot::RwLock;

use super::surface::NowPlayingSurface;
use super::types::{
  CommandAvailability, CommandStatus, EventPayload, RemoteCommand, RemoteEvent, TransportCommand,
};
use crate::channel::ChannelError;

/// Outbound endpoint that delivers commands to the app layer.
pub trait CommandSink: Send + Sync {
  fn send(&self, command: TransportCommand) -> Result<(), ChannelError>;
}

/// Routes system transport events to the app layer and tracks which controls are enabled.
pub struct RemoteCommandCenter {
  sink: Arc<dyn CommandSink>,
  surface: Arc<dyn NowPlayingSurface>,
  availability: RwLock<CommandAvailability>,
  strict_delivery: bool,
}

impl RemoteCommandCenter {
  /// Create the command center and register every control with the surface.
  pub fn new(
    sink: Arc<dyn CommandSink>,
    surface: Arc<dyn NowPlayingSurface>,
    skip_interval: u32,
    strict_delivery: bool,
  ) -> Self {
    for command in RemoteCommand::ALL {
      surface.set_enabled(command, true);
    }
    surface.set_preferred_skip_interval(skip_interval);

    Self {
      sink,
      surface,
      availability: RwLock::new(CommandAvailability {
        can_go_next: true,
        can_go_previous: true,
      }),
      strict_delivery,
    }
  }

  /// Enable or disable the next/previous track controls.
  pub fn update_availability(&self, availability: CommandAvailability) {
    *self.availability.write() = availability;
    self
      .surface
      .set_enabled(RemoteCommand::NextTrack, availability.can_go_next);
    self
      .surface
      .set_enabled(RemoteCommand::PreviousTrack, availability.can_go_previous);
  }

  pub fn availability(&self) -> CommandAvailability {
    *self.availability.read()
  }

  /// Handle one system event and report the status back to the surface.
  pub fn dispatch(&self, event: RemoteEvent) -> CommandStatus {
    if !self.is_enabled(event.command) {
      log::debug!("Ignoring {:?}: control disabled", event.command);
      return CommandStatus::CommandDisabled;
    }

    let Some(command) = translate(&event) else {
      log::warn!("Malformed payload for {:?}: {:?}", event.command, event.payload);
      return CommandStatus::CommandFailed;
    };

    log::info!("Forwarding {:?} to app", command);
    match self.sink.send(command) {
      Ok(()) => CommandStatus::Success,
      Err(e) if command.requires_delivery() || self.strict_delivery => {
        log::warn!("Failed to forward {:?}: {}", command, e);
        CommandStatus::CommandFailed
      }
      Err(e) => {
        log::debug!("Forward of {:?} not delivered: {}", command, e);
        CommandStatus::Success
      }
    }
  }

  fn is_enabled(&self, command: RemoteCommand) -> bool {
    let availability = self.availability.read();
    match command {
      RemoteCommand::NextTrack => availability.can_go_next,
      RemoteCommand::PreviousTrack => availability.can_go_previous,
      _ => true,
    }
  }
}

/// Dispatch table. `None` when the payload does not have the type the control expects.
fn translate(event: &RemoteEvent) -> Option<TransportCommand> {
  match (event.command, event.payload) {
    (RemoteCommand::Play, _) => Some(TransportCommand::Play),
    (RemoteCommand::Pause, _) => Some(TransportCommand::Pause),
    (RemoteCommand::TogglePlayPause, _) => Some(TransportCommand::Toggle),
    (RemoteCommand::NextTrack, _) => Some(TransportCommand::Next),
    (RemoteCommand::PreviousTrack, _) => Some(TransportCommand::Previous),
    (RemoteCommand::SkipForward, EventPayload::SkipInterval(seconds)) => {
      Some(TransportCommand::SeekForward(seconds))
    }
    (RemoteCommand::SkipBackward, EventPayload::SkipInterval(seconds)) => {
      Some(TransportCommand::SeekBackward(seconds))
    }
    (RemoteCommand::ChangePlaybackPosition, EventPayload::PlaybackPosition(seconds)) => {
      Some(TransportCommand::SeekTo(seconds_to_millis(seconds)))
    }
    _ => None,
  }
}

/// Convert seconds to whole milliseconds, truncating.
pub fn seconds_to_millis(seconds: f64) -> i64 {
  (seconds * 1000.0) as i64
}
