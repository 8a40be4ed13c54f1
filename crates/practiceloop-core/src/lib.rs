//! Practiceloop Core - Playhead windows, loop regions and countdowns
//!
//! This library provides the engine behind an audio practice tool: a user
//! loads a track, plays it at variable speed, places bookmarks and loops a
//! region between two of them. The engine keeps two zoomed views (±15s and
//! ±5s) following the playhead smoothly, repositions playback at the loop
//! boundary (optionally behind a 3-second countdown) and persists per-song
//! state through a key-value store.

pub mod bookmarks;
pub mod config;
pub mod driver;
pub mod library;
pub mod playback;
pub mod render;

pub use bookmarks::{Bookmark, BookmarkList};
pub use config::PracticeConfig;
pub use driver::{SessionCommand, SessionHandle, SessionStatus};
pub use library::{JsonFileStore, KeyValueStore, MemoryStore, SongLibrary, SongRecord};
pub use playback::{
    clock::{MediaEngine, PlaybackClock, SimulatedMedia},
    countdown::CountdownSequencer,
    looping::{LoopController, LoopError, LoopPoint, Relocation},
    session::{LoadOutcome, PlayState, Session, SessionError, WindowKind},
    window::WindowTracker,
};
pub use render::{RenderFrame, RenderSink};

/// Library version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Width of the wide zoom window in seconds
pub const WIDE_WINDOW_SECS: f64 = 30.0;

/// Width of the narrow zoom window in seconds
pub const NARROW_WINDOW_SECS: f64 = 10.0;

/// Number of one-second ticks in a countdown
pub const COUNTDOWN_TICKS: u32 = 3;
