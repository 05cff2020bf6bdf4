//! Best-effort artwork download and decode.

use std::time::Duration;

use reqwest::{Client, Url};
use thiserror::Error;

use super::types::Artwork;

#[derive(Error, Debug)]
pub enum ArtworkError {
  #[error("HTTP request failed: {0}")]
  Http(#[from] reqwest::Error),
  #[error("HTTP error: {0}")]
  HttpStatus(u16),
  #[error("Failed to read artwork: {0}")]
  Io(#[from] std::io::Error),
  #[error("Failed to decode artwork: {0}")]
  Decode(#[from] image::ImageError),
  #[error("Unsupported artwork URL: {0}")]
  UnsupportedUrl(String),
  #[error("Artwork fetch timed out")]
  Timeout,
  #[error("Decode task failed")]
  Join,
}

/// Fetches artwork from `http(s)://` and `file://` URLs.
pub struct ArtworkFetcher {
  http: Client,
  timeout: Option<Duration>,
}

impl ArtworkFetcher {
  /// Create a fetcher. `timeout` bounds the whole fetch, `None` waits indefinitely.
  pub fn new(timeout: Option<Duration>) -> Result<Self, ArtworkError> {
    Ok(Self {
      http: Client::builder().build()?,
      timeout,
    })
  }

  /// Create a fetcher around an existing HTTP client.
  pub fn with_client(http: Client, timeout: Option<Duration>) -> Self {
    Self { http, timeout }
  }

  /// Fetch and decode the image at `url`.
  pub async fn fetch(&self, url: &str) -> Result<Artwork, ArtworkError> {
    let bytes = match self.timeout {
      Some(timeout) => tokio::time::timeout(timeout, self.load(url))
        .await
        .map_err(|_| ArtworkError::Timeout)??,
      None => self.load(url).await?,
    };

    // Decoding is CPU bound
    let image = tokio::task::spawn_blocking(move || image::load_from_memory(&bytes))
      .await
      .map_err(|_| ArtworkError::Join)??;

    Ok(Artwork::new(image.to_rgba8()))
  }

  async fn load(&self, url: &str) -> Result<Vec<u8>, ArtworkError> {
    let unsupported = || ArtworkError::UnsupportedUrl(url.to_string());
    let parsed = Url::parse(url).map_err(|_| unsupported())?;
    match parsed.scheme() {
      "http" | "https" => {
        let response = self.http.get(parsed).send().await?;
        if !response.status().is_success() {
          return Err(ArtworkError::HttpStatus(response.status().as_u16()));
        }
        Ok(response.bytes().await?.to_vec())
      }
      "file" => {
        // Percent-decoded local path
        let path = parsed.to_file_path().map_err(|_| unsupported())?;
        Ok(tokio::fs::read(path).await?)
      }
      _ => Err(unsupported()),
    }
  }
}
