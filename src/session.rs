//! Audio session setup.
//!
//! The bridge asks the platform for an exclusive playback session at startup.
//! A rejected request is logged and otherwise ignored: the rest of the bridge
//! works without an active session.

use parking_lot::Mutex;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AudioSessionError {
  #[error("Category rejected: {0}")]
  CategoryRejected(String),
  #[error("Audio hardware unavailable")]
  HardwareUnavailable,
  #[error("Activation failed: {0}")]
  ActivationFailed(String),
}

/// Audio session category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum AudioCategory {
  /// Playback that keeps going with the screen locked or the ringer muted.
  Playback,
}

/// Category request passed to the platform session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioSessionRequest {
  pub category: AudioCategory,
  pub default_to_speaker: bool,
}

impl AudioSessionRequest {
  pub fn playback(default_to_speaker: bool) -> Self {
    Self {
      category: AudioCategory::Playback,
      default_to_speaker,
    }
  }
}

/// Platform audio session.
pub trait AudioSession: Send + Sync {
  fn set_category(&self, request: &AudioSessionRequest) -> Result<(), AudioSessionError>;
  fn set_active(&self, active: bool) -> Result<(), AudioSessionError>;
}

/// Request the category and activate the session. Returns whether the session is active.
pub fn activate(session: &dyn AudioSession, request: &AudioSessionRequest) -> bool {
  let result = session
    .set_category(request)
    .and_then(|_| session.set_active(true));

  match result {
    Ok(()) => {
      log::info!("Audio session active: {:?}", request);
      true
    }
    Err(e) => {
      log::error!("Failed to set up audio session: {}", e);
      false
    }
  }
}

/// Session used when no platform audio session exists. Records the request, never fails.
#[derive(Default)]
pub struct HeadlessAudioSession {
  state: Mutex<(Option<AudioSessionRequest>, bool)>,
}

impl HeadlessAudioSession {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn category(&self) -> Option<AudioSessionRequest> {
    self.state.lock().0
  }

  pub fn is_active(&self) -> bool {
    self.state.lock().1
  }
}

impl AudioSession for HeadlessAudioSession {
  fn set_category(&self, request: &AudioSessionRequest) -> Result<(), AudioSessionError> {
    log::debug!("Headless audio session category: {:?}", request);
    self.state.lock().0 = Some(*request);
    Ok(())
  }

  fn set_active(&self, active: bool) -> Result<(), AudioSessionError> {
    self.state.lock().1 = active;
    Ok(())
  }
}
