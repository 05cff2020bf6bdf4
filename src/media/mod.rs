//! Media session module - now-playing display and transport controls.
//!
//! Architecture:
//! - `types.rs` - Now-playing, availability and transport command types
//! - `surface.rs` - System display/transport surface trait and headless backend
//! - `artwork.rs` - Artwork download and decode
//! - `now_playing.rs` - Two-phase now-playing publisher
//! - `remote.rs` - Transport event dispatch table
//! - `console.rs` - stdin transport source for headless hosts

mod artwork;
mod console;
mod now_playing;
mod remote;
mod surface;
mod types;

pub use artwork::{ArtworkError, ArtworkFetcher};
pub use console::{parse_event, run_console, spawn_line_reader};
pub use now_playing::NowPlayingPublisher;
pub use remote::{seconds_to_millis, CommandSink, RemoteCommandCenter};
pub use surface::{HeadlessSurface, NowPlayingSurface};
pub use types::*;
