//! Console transport: reads media-key style events from a line stream.
//!
//! Used by the headless daemon where no system transport surface exists.
//! Input is read on a plain thread so a blocked read never holds up runtime
//! shutdown.
//! One event per line: `play`, `pause`, `toggle`, `next`, `previous`,
//! `skip-forward [s]`, `skip-backward [s]`, `seek <s>`.

use std::io::BufRead;
use std::sync::Arc;

use async_channel::Receiver;
use tokio_util::sync::CancellationToken;

use super::remote::RemoteCommandCenter;
use super::types::{EventPayload, RemoteCommand, RemoteEvent};

/// Parse one console line. `None` for blank lines and unknown words.
///
/// A skip without an argument uses `default_interval`; an argument that is
/// not a number produces an event with no payload.
pub fn parse_event(line: &str, default_interval: u32) -> Option<RemoteEvent> {
  let mut parts = line.split_whitespace();
  let word = parts.next()?.to_ascii_lowercase();
  let arg = parts.next();

  let number = |payload: fn(f64) -> EventPayload| match arg {
    Some(value) => value.parse::<f64>().map(payload).unwrap_or(EventPayload::None),
    None => EventPayload::None,
  };

  let event = match word.as_str() {
    "play" => RemoteEvent::new(RemoteCommand::Play),
    "pause" => RemoteEvent::new(RemoteCommand::Pause),
    "toggle" => RemoteEvent::new(RemoteCommand::TogglePlayPause),
    "next" => RemoteEvent::new(RemoteCommand::NextTrack),
    "previous" | "prev" => RemoteEvent::new(RemoteCommand::PreviousTrack),
    "skip-forward" | "ff" => RemoteEvent {
      command: RemoteCommand::SkipForward,
      payload: match arg {
        None => EventPayload::SkipInterval(default_interval as f64),
        Some(_) => number(EventPayload::SkipInterval),
      },
    },
    "skip-backward" | "rew" => RemoteEvent {
      command: RemoteCommand::SkipBackward,
      payload: match arg {
        None => EventPayload::SkipInterval(default_interval as f64),
        Some(_) => number(EventPayload::SkipInterval),
      },
    },
    "seek" => RemoteEvent {
      command: RemoteCommand::ChangePlaybackPosition,
      payload: number(EventPayload::PlaybackPosition),
    },
    _ => return None,
  };
  Some(event)
}

/// Read lines from `reader` on a dedicated thread.
///
/// The thread is detached; the receiver closes at EOF or on a read error.
pub fn spawn_line_reader<R>(reader: R) -> Receiver<String>
where
  R: BufRead + Send + 'static,
{
  let (tx, rx) = async_channel::unbounded();
  let spawned = std::thread::Builder::new()
    .name("console-input".into())
    .spawn(move || {
      for line in reader.lines() {
        match line {
          Ok(line) => {
            if tx.send_blocking(line).is_err() {
              break;
            }
          }
          Err(e) => {
            log::error!("Console read error: {}", e);
            break;
          }
        }
      }
    });
  if let Err(e) = spawned {
    log::error!("Failed to start console reader: {}", e);
  }
  rx
}

/// Feed events from `lines` into `commands` until the input closes or shutdown.
pub async fn run_console(
  lines: Receiver<String>,
  commands: Arc<RemoteCommandCenter>,
  default_interval: u32,
  shutdown: CancellationToken,
) {
  log::info!("Console transport started");

  loop {
    let line = tokio::select! {
      _ = shutdown.cancelled() => break,
      line = lines.recv() => line,
    };

    let Ok(line) = line else {
      log::info!("Console input closed");
      break;
    };
    if line.trim().is_empty() {
      continue;
    }
    match parse_event(&line, default_interval) {
      Some(event) => {
        let status = commands.dispatch(event);
        log::info!("{:?} -> {:?}", event.command, status);
      }
      None => log::warn!("Unknown console command: {}", line.trim()),
    }
  }
}
