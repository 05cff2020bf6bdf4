//! System now-playing display and transport surface.

use std::collections::HashMap;

use parking_lot::RwLock;

use super::types::{NowPlayingRecord, RemoteCommand};

/// The system-owned now-playing display and transport controls.
///
/// Each `publish` replaces the record the system holds. Implementations are
/// called from the channel reader and from artwork tasks, so they must
/// serialize internally.
pub trait NowPlayingSurface: Send + Sync {
  /// Replace the displayed now-playing record.
  fn publish(&self, record: NowPlayingRecord);
  /// Enable or disable a transport control.
  fn set_enabled(&self, command: RemoteCommand, enabled: bool);
  /// Preferred interval for the skip forward/backward controls.
  fn set_preferred_skip_interval(&self, seconds: u32);
}

#[derive(Default)]
struct SurfaceState {
  current: Option<NowPlayingRecord>,
  publish_count: u64,
  enabled: HashMap<RemoteCommand, bool>,
  skip_interval: Option<u32>,
}

/// Surface for hosts without a system media display. Logs updates and keeps the latest state.
#[derive(Default)]
pub struct HeadlessSurface {
  state: RwLock<SurfaceState>,
}

impl HeadlessSurface {
  pub fn new() -> Self {
    Self::default()
  }

  /// Currently displayed record.
  pub fn current(&self) -> Option<NowPlayingRecord> {
    self.state.read().current.clone()
  }

  /// Number of records published so far.
  pub fn publish_count(&self) -> u64 {
    self.state.read().publish_count
  }

  /// Controls are enabled until told otherwise.
  pub fn is_enabled(&self, command: RemoteCommand) -> bool {
    self.state.read().enabled.get(&command).copied().unwrap_or(true)
  }

  pub fn skip_interval(&self) -> Option<u32> {
    self.state.read().skip_interval
  }
}

impl NowPlayingSurface for HeadlessSurface {
  fn publish(&self, record: NowPlayingRecord) {
    log::info!(
      "Now playing: {} - {} [{:.1}/{:.1}s, rate {}, artwork {:?}]",
      record.artist,
      record.title,
      record.elapsed,
      record.duration,
      record.playback_rate,
      record.artwork
    );
    let mut state = self.state.write();
    state.current = Some(record);
    state.publish_count += 1;
  }

  fn set_enabled(&self, command: RemoteCommand, enabled: bool) {
    log::debug!("{:?} enabled={}", command, enabled);
    self.state.write().enabled.insert(command, enabled);
  }

  fn set_preferred_skip_interval(&self, seconds: u32) {
    self.state.write().skip_interval = Some(seconds);
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::media::types::NowPlayingInfo;

  #[test]
  fn headless_surface_keeps_last_record() {
    let surface = HeadlessSurface::new();
    assert!(surface.current().is_none());
    assert!(surface.is_enabled(RemoteCommand::NextTrack));

    let first = NowPlayingInfo {
      title: "One".into(),
      ..Default::default()
    };
    let second = NowPlayingInfo {
      title: "Two".into(),
      ..Default::default()
    };
    surface.publish(NowPlayingRecord::from_info(&first));
    surface.publish(NowPlayingRecord::from_info(&second));

    assert_eq!(surface.publish_count(), 2);
    assert_eq!(surface.current().unwrap().title, "Two");

    surface.set_enabled(RemoteCommand::NextTrack, false);
    assert!(!surface.is_enabled(RemoteCommand::NextTrack));
    surface.set_preferred_skip_interval(15);
    assert_eq!(surface.skip_interval(), Some(15));
  }
}
