//! Recording doubles shared by unit tests.

use std::collections::HashMap;
use std::io::Cursor;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use crate::channel::ChannelError;
use crate::media::{
  ArtworkFetcher, CommandSink, NowPlayingRecord, NowPlayingSurface, RemoteCommand, TransportCommand,
};

fn solid_png(width: u32, height: u32) -> image::RgbaImage {
  image::RgbaImage::from_pixel(width, height, image::Rgba([200, 40, 40, 255]))
}

/// `file://` URL for an absolute path, percent-encoded.
pub fn file_url(path: &Path) -> String {
  reqwest::Url::from_file_path(path).unwrap().to_string()
}

/// Write a `width`x`height` PNG into `dir` and return its `file://` URL.
pub fn write_png(dir: &Path, name: &str, width: u32, height: u32) -> String {
  let path = dir.join(name);
  solid_png(width, height).save(&path).unwrap();
  file_url(&path)
}

/// Encoded bytes of a `width`x`height` PNG.
pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
  let mut bytes = Vec::new();
  solid_png(width, height)
    .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
    .unwrap();
  bytes
}

/// Serve `body` at `route` from a loopback HTTP/1.1 server. Other paths get 404.
/// Returns the base URL.
pub async fn serve_png(route: &'static str, body: Vec<u8>) -> String {
  let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
  let addr = listener.local_addr().unwrap();

  tokio::spawn(async move {
    while let Ok((mut stream, _)) = listener.accept().await {
      let body = body.clone();
      tokio::spawn(async move {
        let mut request = Vec::new();
        let mut buf = [0u8; 1024];
        while !request.windows(4).any(|w| w == b"\r\n\r\n") {
          match stream.read(&mut buf).await {
            Ok(0) | Err(_) => return,
            Ok(n) => request.extend_from_slice(&buf[..n]),
          }
        }

        let head = String::from_utf8_lossy(&request);
        let found = head.split_whitespace().nth(1) == Some(route);
        let (status, body) = if found {
          ("200 OK", body)
        } else {
          ("404 Not Found", Vec::new())
        };
        let header = format!(
          "HTTP/1.1 {}\r\nContent-Type: image/png\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
          status,
          body.len()
        );
        let _ = stream.write_all(header.as_bytes()).await;
        let _ = stream.write_all(&body).await;
        let _ = stream.shutdown().await;
      });
    }
  });

  format!("http://{}", addr)
}

/// Fetcher whose client ignores proxy settings, for loopback servers.
pub fn loopback_fetcher() -> ArtworkFetcher {
  let http = reqwest::Client::builder().no_proxy().build().unwrap();
  ArtworkFetcher::with_client(http, None)
}

/// Surface that records every publish in order.
#[derive(Default)]
pub struct RecordingSurface {
  records: Mutex<Vec<NowPlayingRecord>>,
  enabled: Mutex<HashMap<RemoteCommand, bool>>,
  skip_interval: Mutex<Option<u32>>,
}

impl RecordingSurface {
  pub fn records(&self) -> Vec<NowPlayingRecord> {
    self.records.lock().clone()
  }

  pub fn last(&self) -> Option<NowPlayingRecord> {
    self.records.lock().last().cloned()
  }

  pub fn enabled(&self, command: RemoteCommand) -> Option<bool> {
    self.enabled.lock().get(&command).copied()
  }

  pub fn skip_interval(&self) -> Option<u32> {
    *self.skip_interval.lock()
  }
}

impl NowPlayingSurface for RecordingSurface {
  fn publish(&self, record: NowPlayingRecord) {
    self.records.lock().push(record);
  }

  fn set_enabled(&self, command: RemoteCommand, enabled: bool) {
    self.enabled.lock().insert(command, enabled);
  }

  fn set_preferred_skip_interval(&self, seconds: u32) {
    *self.skip_interval.lock() = Some(seconds);
  }
}

/// Sink that records forwarded commands; can simulate a missing app endpoint.
pub struct RecordingSink {
  sent: Mutex<Vec<TransportCommand>>,
  available: AtomicBool,
}

impl RecordingSink {
  pub fn new() -> Self {
    Self {
      sent: Mutex::new(Vec::new()),
      available: AtomicBool::new(true),
    }
  }

  pub fn unavailable() -> Self {
    let sink = Self::new();
    sink.available.store(false, Ordering::SeqCst);
    sink
  }

  pub fn sent(&self) -> Vec<TransportCommand> {
    self.sent.lock().clone()
  }
}

impl CommandSink for RecordingSink {
  fn send(&self, command: TransportCommand) -> Result<(), ChannelError> {
    if !self.available.load(Ordering::SeqCst) {
      return Err(ChannelError::Unavailable);
    }
    self.sent.lock().push(command);
    Ok(())
  }
}
