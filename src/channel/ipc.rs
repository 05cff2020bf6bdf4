//! Named channel server.
//!
//! Listens on a Unix socket (Linux/macOS) or named pipe (Windows) derived
//! from the channel name. Each app connection gets a reader task answering
//! method calls and a writer task draining an outbound queue. The newest
//! connection owns the outbound endpoint.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_channel::{Receiver, Sender};
use parking_lot::RwLock;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio_util::sync::CancellationToken;

use super::protocol::{ChannelMessage, Invocation, MethodCall, MethodResponse};
use crate::media::{CommandSink, TransportCommand};

#[derive(Error, Debug)]
pub enum ChannelError {
  #[error("Failed to bind {path}: {source}")]
  Bind {
    path: String,
    source: std::io::Error,
  },
  #[error("IO error: {0}")]
  Io(#[from] std::io::Error),
  #[error("Encode failed: {0}")]
  Encode(#[from] serde_json::Error),
  #[error("App channel unavailable")]
  Unavailable,
}

/// Handles method calls arriving from the app layer.
pub trait MethodHandler: Send + Sync {
  fn handle_call(&self, call: MethodCall) -> MethodResponse;
}

/// Writer channel message.
enum WriteMessage {
  Line(Vec<u8>),
  Close,
}

/// Replace characters that are not valid in socket and pipe names.
pub fn sanitize_channel_name(name: &str) -> String {
  name
    .chars()
    .map(|c| {
      if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
        c
      } else {
        '-'
      }
    })
    .collect()
}

/// Socket/pipe path for a channel name.
pub fn channel_path(name: &str, socket_dir: Option<&Path>) -> String {
  let name = sanitize_channel_name(name);
  #[cfg(windows)]
  {
    let _ = socket_dir;
    format!(r"\\.\pipe\{}", name)
  }
  #[cfg(not(windows))]
  {
    let dir = socket_dir
      .map(Path::to_path_buf)
      .unwrap_or_else(std::env::temp_dir);
    dir.join(format!("{}.sock", name)).to_string_lossy().into_owned()
  }
}

/// Remove a stale socket file.
fn cleanup_socket(path: &str) {
  #[cfg(not(windows))]
  {
    let _ = std::fs::remove_file(PathBuf::from(path));
  }
  // Windows named pipes are cleaned up automatically
  #[cfg(windows)]
  let _ = path;
}

/// Encode `value` as one newline-terminated channel line.
fn encode_line<T: serde::Serialize>(value: &T) -> Result<Vec<u8>, serde_json::Error> {
  let mut line = serde_json::to_vec(value)?;
  line.push(b'\n');
  Ok(line)
}

/// The live app connection: its writer queue and the token that tears it down.
struct Connection {
  tx: Sender<WriteMessage>,
  cancel: CancellationToken,
}

/// Outbound endpoint to the connected app.
#[derive(Default)]
pub struct AppChannel {
  current: RwLock<Option<Connection>>,
}

impl AppChannel {
  pub fn new() -> Self {
    Self::default()
  }

  /// Check if an app is connected.
  pub fn is_connected(&self) -> bool {
    self
      .current
      .read()
      .as_ref()
      .map(|conn| !conn.tx.is_closed())
      .unwrap_or(false)
  }

  /// Queue an invocation for the connected app.
  pub fn invoke(&self, invocation: &Invocation) -> Result<(), ChannelError> {
    let line = encode_line(invocation)?;
    let guard = self.current.read();
    let conn = guard.as_ref().ok_or(ChannelError::Unavailable)?;
    conn
      .tx
      .try_send(WriteMessage::Line(line))
      .map_err(|_| ChannelError::Unavailable)
  }

  /// Make `tx` the live connection. The previous connection is cancelled.
  fn attach(&self, tx: Sender<WriteMessage>, cancel: CancellationToken) {
    if let Some(old) = self.current.write().replace(Connection { tx, cancel }) {
      log::info!("Replacing previous app connection");
      old.cancel.cancel();
      let _ = old.tx.try_send(WriteMessage::Close);
    }
  }

  fn detach(&self, tx: &Sender<WriteMessage>) {
    let mut current = self.current.write();
    if current.as_ref().is_some_and(|conn| conn.tx.same_channel(tx)) {
      *current = None;
    }
  }

  fn close(&self) {
    if let Some(conn) = self.current.write().take() {
      conn.cancel.cancel();
      let _ = conn.tx.try_send(WriteMessage::Close);
    }
  }
}

impl CommandSink for AppChannel {
  fn send(&self, command: TransportCommand) -> Result<(), ChannelError> {
    self.invoke(&Invocation::from(command))
  }
}

/// Server side of the named channel.
pub struct ChannelServer {
  path: String,
}

impl ChannelServer {
  pub fn new(channel_name: &str, socket_dir: Option<&Path>) -> Self {
    Self {
      path: channel_path(channel_name, socket_dir),
    }
  }

  pub fn path(&self) -> &str {
    &self.path
  }

  /// Accept app connections until `shutdown` is cancelled.
  #[cfg(not(windows))]
  pub async fn serve(
    &self,
    handler: Arc<dyn MethodHandler>,
    app: Arc<AppChannel>,
    shutdown: CancellationToken,
  ) -> Result<(), ChannelError> {
    use tokio::net::UnixListener;

    cleanup_socket(&self.path);
    let listener = UnixListener::bind(&self.path).map_err(|source| ChannelError::Bind {
      path: self.path.clone(),
      source,
    })?;
    log::info!("Channel listening on {}", self.path);

    loop {
      tokio::select! {
        _ = shutdown.cancelled() => break,
        accepted = listener.accept() => {
          match accepted {
            Ok((stream, _)) => {
              log::info!("App connected");
              let (reader, writer) = tokio::io::split(stream);
              Self::spawn_connection(reader, writer, handler.clone(), app.clone(), shutdown.clone());
            }
            Err(e) => log::error!("Channel accept error: {}", e),
          }
        }
      }
    }

    app.close();
    cleanup_socket(&self.path);
    log::info!("Channel server stopped");
    Ok(())
  }

  /// Accept app connections until `shutdown` is cancelled.
  #[cfg(windows)]
  pub async fn serve(
    &self,
    handler: Arc<dyn MethodHandler>,
    app: Arc<AppChannel>,
    shutdown: CancellationToken,
  ) -> Result<(), ChannelError> {
    use tokio::net::windows::named_pipe::ServerOptions;

    let bind_error = |source| ChannelError::Bind {
      path: self.path.clone(),
      source,
    };
    let mut server = ServerOptions::new()
      .first_pipe_instance(true)
      .create(&self.path)
      .map_err(bind_error)?;
    log::info!("Channel listening on {}", self.path);

    loop {
      tokio::select! {
        _ = shutdown.cancelled() => break,
        connected = server.connect() => {
          if let Err(e) = connected {
            log::error!("Channel accept error: {}", e);
            // A failed instance cannot be reused
            server = ServerOptions::new().create(&self.path).map_err(bind_error)?;
            continue;
          }
          log::info!("App connected");
          let next = ServerOptions::new().create(&self.path).map_err(bind_error)?;
          let stream = std::mem::replace(&mut server, next);
          let (reader, writer) = tokio::io::split(stream);
          Self::spawn_connection(reader, writer, handler.clone(), app.clone(), shutdown.clone());
        }
      }
    }

    app.close();
    log::info!("Channel server stopped");
    Ok(())
  }

  fn spawn_connection<R, W>(
    reader: R,
    writer: W,
    handler: Arc<dyn MethodHandler>,
    app: Arc<AppChannel>,
    shutdown: CancellationToken,
  ) where
    R: tokio::io::AsyncRead + Send + Unpin + 'static,
    W: tokio::io::AsyncWrite + Send + Unpin + 'static,
  {
    let (write_tx, write_rx) = async_channel::unbounded::<WriteMessage>();
    let cancel = shutdown.child_token();
    app.attach(write_tx.clone(), cancel.clone());

    tokio::spawn(async move {
      Self::writer_loop(writer, write_rx).await;
    });

    tokio::spawn(async move {
      tokio::select! {
        biased;
        _ = cancel.cancelled() => {
          log::debug!("App connection cancelled");
        }
        _ = Self::reader_loop(reader, handler, write_tx.clone()) => {}
      }
      app.detach(&write_tx);
      let _ = write_tx.try_send(WriteMessage::Close);
    });
  }

  async fn reader_loop<R: tokio::io::AsyncRead + Unpin>(
    reader: R,
    handler: Arc<dyn MethodHandler>,
    write_tx: Sender<WriteMessage>,
  ) {
    log::debug!("Channel reader loop started");
    let mut buf_reader = BufReader::new(reader);
    let mut line = String::new();

    loop {
      line.clear();
      match buf_reader.read_line(&mut line).await {
        Ok(0) => {
          log::info!("App disconnected");
          break;
        }
        Ok(_) => {
          let trimmed = line.trim();
          if trimmed.is_empty() {
            continue;
          }

          match ChannelMessage::parse(trimmed) {
            Ok(ChannelMessage::Call(call)) => {
              let id = call.id;
              let response = handler.handle_call(call);
              if id.is_none() {
                continue;
              }
              match encode_line(&response) {
                Ok(json) => {
                  if write_tx.send(WriteMessage::Line(json)).await.is_err() {
                    break;
                  }
                }
                Err(e) => log::error!("Failed to encode response: {}", e),
              }
            }
            Ok(ChannelMessage::Other(value)) => {
              log::debug!("Ignoring non-call message: {}", value);
            }
            Err(e) => {
              log::warn!("Failed to parse channel message: {} - {}", e, trimmed);
            }
          }
        }
        Err(e) => {
          log::error!("Channel read error: {}", e);
          break;
        }
      }
    }
  }

  async fn writer_loop<W: tokio::io::AsyncWrite + Unpin>(
    mut writer: W,
    write_rx: Receiver<WriteMessage>,
  ) {
    log::debug!("Channel writer loop started");

    while let Ok(msg) = write_rx.recv().await {
      match msg {
        WriteMessage::Line(line) => {
          // Line already carries its newline; one write keeps it whole
          if let Err(e) = writer.write_all(&line).await {
            log::error!("Channel write error: {}", e);
            break;
          }
          if let Err(e) = writer.flush().await {
            log::error!("Channel flush error: {}", e);
            break;
          }
        }
        WriteMessage::Close => {
          log::debug!("Channel writer closing");
          let _ = writer.shutdown().await;
          break;
        }
      }
    }
    write_rx.close();
  }
}
