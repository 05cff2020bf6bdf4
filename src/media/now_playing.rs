//! Now-playing publisher.
//!
//! Text metadata goes to the surface immediately; artwork follows once the
//! background fetch decodes it. Fetches are keyed by artwork URL: a new
//! update with a different URL cancels the in-flight fetch, and a fetch that
//! lands only ever decorates the latest info, never the info it started with.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::artwork::ArtworkFetcher;
use super::surface::NowPlayingSurface;
use super::types::{Artwork, NowPlayingInfo, NowPlayingRecord};

struct InflightFetch {
  url: String,
  cancel: CancellationToken,
}

#[derive(Default)]
struct PublisherState {
  latest: Option<NowPlayingInfo>,
  inflight: Option<InflightFetch>,
  /// Last decoded artwork, keyed by URL.
  cached: Option<(String, Artwork)>,
}

/// Publishes now-playing updates to the surface.
pub struct NowPlayingPublisher {
  surface: Arc<dyn NowPlayingSurface>,
  fetcher: Arc<ArtworkFetcher>,
  state: Arc<Mutex<PublisherState>>,
}

impl NowPlayingPublisher {
  pub fn new(surface: Arc<dyn NowPlayingSurface>, fetcher: Arc<ArtworkFetcher>) -> Self {
    Self {
      surface,
      fetcher,
      state: Arc::new(Mutex::new(PublisherState::default())),
    }
  }

  /// Publish `info`. Returns the artwork task when a fetch was started.
  ///
  /// Must be called from within a tokio runtime when `info` carries artwork.
  pub fn update(&self, info: NowPlayingInfo) -> Option<JoinHandle<()>> {
    let mut state = self.state.lock();
    let record = NowPlayingRecord::from_info(&info);
    let url = info.artwork().map(str::to_string);

    // Any fetch for a different URL is stale now
    let keep_inflight = matches!(
      (&state.inflight, &url),
      (Some(inflight), Some(url)) if inflight.url == *url
    );
    if !keep_inflight {
      if let Some(inflight) = state.inflight.take() {
        log::debug!("Cancelling artwork fetch for {}", inflight.url);
        inflight.cancel.cancel();
      }
    }

    let cached = match (&state.cached, &url) {
      (Some((cached_url, artwork)), Some(url)) if cached_url == url => Some(artwork.clone()),
      _ => None,
    };

    state.latest = Some(info);

    match (url, cached) {
      (None, _) => {
        self.surface.publish(record);
        None
      }
      (Some(_), Some(artwork)) => {
        self.surface.publish(record.with_artwork(artwork));
        None
      }
      (Some(url), None) => {
        self.surface.publish(record);
        if keep_inflight {
          return None;
        }

        let cancel = CancellationToken::new();
        state.inflight = Some(InflightFetch {
          url: url.clone(),
          cancel: cancel.clone(),
        });
        Some(self.spawn_fetch(url, cancel))
      }
    }
  }

  fn spawn_fetch(&self, url: String, cancel: CancellationToken) -> JoinHandle<()> {
    let surface = self.surface.clone();
    let fetcher = self.fetcher.clone();
    let state = self.state.clone();

    tokio::spawn(async move {
      let result = tokio::select! {
        _ = cancel.cancelled() => return,
        result = fetcher.fetch(&url) => result,
      };

      let mut state = state.lock();
      if cancel.is_cancelled() {
        return;
      }
      state.inflight = None;

      let artwork = match result {
        Ok(artwork) => artwork,
        Err(e) => {
          log::debug!("Artwork fetch for {} failed: {}", url, e);
          return;
        }
      };
      state.cached = Some((url.clone(), artwork.clone()));

      let Some(latest) = state.latest.as_ref() else {
        return;
      };
      if latest.artwork() != Some(url.as_str()) {
        return;
      }
      log::debug!("Artwork ready ({:?}), republishing", artwork);
      surface.publish(NowPlayingRecord::from_info(latest).with_artwork(artwork));
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::testing::{file_url, loopback_fetcher, png_bytes, serve_png, write_png, RecordingSurface};

  fn publisher() -> (NowPlayingPublisher, Arc<RecordingSurface>) {
    let surface = Arc::new(RecordingSurface::default());
    let fetcher = Arc::new(loopback_fetcher());
    (NowPlayingPublisher::new(surface.clone(), fetcher), surface)
  }

  fn info(title: &str, artwork: Option<String>) -> NowPlayingInfo {
    NowPlayingInfo {
      title: title.into(),
      artist: "Artist".into(),
      duration_ms: 200_000,
      position_ms: 1_500,
      is_playing: true,
      artwork_url: artwork,
    }
  }

  #[tokio::test]
  async fn text_only_update_publishes_once() {
    let (publisher, surface) = publisher();
    assert!(publisher.update(info("Song", None)).is_none());

    let records = surface.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].duration, 200.0);
    assert_eq!(records[0].elapsed, 1.5);
    assert_eq!(records[0].playback_rate, 1.0);
    assert!(records[0].artwork.is_none());
  }

  #[tokio::test]
  async fn artwork_follows_text() {
    let dir = tempfile::tempdir().unwrap();
    let url = write_png(dir.path(), "cover.png", 40, 20);
    let (publisher, surface) = publisher();

    let handle = publisher.update(info("Song", Some(url))).unwrap();
    handle.await.unwrap();

    let records = surface.records();
    assert_eq!(records.len(), 2);
    assert!(records[0].artwork.is_none());
    let artwork = records[1].artwork.as_ref().unwrap();
    assert_eq!((artwork.width(), artwork.height()), (40, 20));
    assert_eq!(records[1].title, "Song");
  }

  #[tokio::test]
  async fn failed_artwork_leaves_text_only() {
    let dir = tempfile::tempdir().unwrap();
    let url = file_url(&dir.path().join("missing.png"));
    let (publisher, surface) = publisher();

    let handle = publisher.update(info("Song", Some(url))).unwrap();
    handle.await.unwrap();

    let records = surface.records();
    assert_eq!(records.len(), 1);
    assert!(records[0].artwork.is_none());
  }

  #[tokio::test]
  async fn http_artwork_follows_text() {
    let base = serve_png("/art/cover.png", png_bytes(30, 15)).await;
    let (publisher, surface) = publisher();

    let handle = publisher
      .update(info("Song", Some(format!("{}/art/cover.png", base))))
      .unwrap();
    handle.await.unwrap();

    let records = surface.records();
    assert_eq!(records.len(), 2);
    assert!(records[0].artwork.is_none());
    let artwork = records[1].artwork.as_ref().unwrap();
    assert_eq!((artwork.width(), artwork.height()), (30, 15));
  }

  #[tokio::test]
  async fn http_error_leaves_text_only() {
    let base = serve_png("/art/cover.png", png_bytes(30, 15)).await;
    let (publisher, surface) = publisher();

    let handle = publisher
      .update(info("Song", Some(format!("{}/art/missing.png", base))))
      .unwrap();
    handle.await.unwrap();

    let records = surface.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].title, "Song");
    assert!(records[0].artwork.is_none());
  }

  #[tokio::test]
  async fn superseded_fetch_does_not_clobber_newer_update() {
    let dir = tempfile::tempdir().unwrap();
    let url = write_png(dir.path(), "old.png", 8, 8);
    let (publisher, surface) = publisher();

    let handle = publisher.update(info("Old", Some(url))).unwrap();
    publisher.update(info("New", None));
    handle.await.unwrap();

    let last = surface.last().unwrap();
    assert_eq!(last.title, "New");
    assert!(last.artwork.is_none());
    assert!(surface.records().iter().all(|r| r.artwork.is_none()));
  }

  #[tokio::test]
  async fn same_artwork_merges_into_latest_info() {
    let dir = tempfile::tempdir().unwrap();
    let url = write_png(dir.path(), "cover.png", 16, 16);
    let (publisher, surface) = publisher();

    let handle = publisher.update(info("Song", Some(url.clone()))).unwrap();
    let mut progressed = info("Song", Some(url.clone()));
    progressed.position_ms = 9_000;
    // Same URL keeps the in-flight fetch
    assert!(publisher.update(progressed).is_none());
    handle.await.unwrap();

    let last = surface.last().unwrap();
    assert_eq!(last.elapsed, 9.0);
    assert!(last.artwork.is_some());

    // Cached artwork is attached straight away
    let mut paused = info("Song", Some(url));
    paused.is_playing = false;
    assert!(publisher.update(paused).is_none());
    let last = surface.last().unwrap();
    assert_eq!(last.playback_rate, 0.0);
    assert!(last.artwork.is_some());
  }
}
