//! Practiceloop - audio practice tool engine
//!
//! This library re-exports the playback tracking, loop, countdown and
//! persistence functionality from `practiceloop-core`.

pub use practiceloop_core::bookmarks;
pub use practiceloop_core::config;
pub use practiceloop_core::driver;
pub use practiceloop_core::library;
pub use practiceloop_core::playback;
pub use practiceloop_core::render;

pub use practiceloop_core::{
    Bookmark, BookmarkList, CountdownSequencer, JsonFileStore, KeyValueStore, LoadOutcome,
    LoopController, LoopError, LoopPoint, MediaEngine, MemoryStore, PlayState, PlaybackClock,
    PracticeConfig, Relocation, RenderFrame, RenderSink, Session, SessionCommand, SessionError,
    SessionHandle, SessionStatus, SimulatedMedia, SongLibrary, SongRecord, WindowKind,
    WindowTracker,
};
pub use practiceloop_core::{COUNTDOWN_TICKS, NARROW_WINDOW_SECS, VERSION, WIDE_WINDOW_SECS};
