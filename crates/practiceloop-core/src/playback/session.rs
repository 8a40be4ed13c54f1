//! Session controller
//!
//! Owns all per-song state and the media engine, and runs the per-tick
//! pipeline in a fixed order:
//!
//! 1. Zoom windows advance with the elapsed wall-clock time
//! 2. Bookmark markers are recomputed against the new window bounds
//! 3. The loop controller inspects the fresh position
//!
//! Every mutating user action is persisted to the song library right away.

use super::clock::{MediaEngine, PlaybackClock};
use super::countdown::{CountdownSequencer, CountdownTick, OnComplete};
use super::looping::{LoopController, LoopError, LoopPoint, Relocation};
use super::window::{WindowBounds, WindowTracker};
use crate::bookmarks::{Bookmark, BookmarkId, BookmarkList};
use crate::config::PracticeConfig;
use crate::library::{
    song_id, GlobalData, KeyValueStore, LastSession, SongLibrary, SongRecord, StoreError,
};
use crate::render::{
    full_track_markers, loop_overlay, window_markers, RenderFrame, RenderSink, TimeDisplay,
    WindowView,
};
use chrono::Utc;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Errors surfaced to the user by session operations
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("No song loaded")]
    NoSongLoaded,

    #[error("Track metadata is not available yet")]
    MetadataNotReady,

    #[error("Bookmark not found: {0}")]
    UnknownBookmark(BookmarkId),

    #[error("Loop error: start and end are at the same position ({time:.2}s)")]
    DegenerateLoop { time: f64 },

    #[error("Invalid playback speed: {0}")]
    InvalidSpeed(f64),

    #[error(transparent)]
    Loop(#[from] LoopError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Which zoom window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowKind {
    /// ±15s
    Wide,
    /// ±5s
    Narrow,
}

/// Result of a play/pause request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayState {
    Playing,
    Paused,
    /// Request ignored while a countdown runs
    CountingDown,
}

/// Outcome of loading a track
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadOutcome {
    pub song_id: String,
    /// Whether stored state was found and applied
    pub restored: bool,
    pub bookmark_count: usize,
}

/// The song currently loaded
#[derive(Debug, Clone, PartialEq)]
pub struct SongContext {
    pub id: String,
    pub file_name: String,
    /// Accumulated practice time for this song (ms)
    pub total_practice_ms: u64,
}

/// User-started practice stopwatch
#[derive(Debug, Clone, Default)]
pub struct PracticeTimer {
    started: Option<Instant>,
}

impl PracticeTimer {
    pub fn is_running(&self) -> bool {
        self.started.is_some()
    }

    pub fn start(&mut self, now: Instant) {
        self.started.get_or_insert(now);
    }

    /// Stop the timer and return the elapsed milliseconds
    pub fn stop(&mut self, now: Instant) -> u64 {
        self.started
            .take()
            .map(|started| now.saturating_duration_since(started).as_millis() as u64)
            .unwrap_or(0)
    }

    /// Milliseconds on the running timer
    pub fn running_ms(&self, now: Instant) -> u64 {
        self.started
            .map(|started| now.saturating_duration_since(started).as_millis() as u64)
            .unwrap_or(0)
    }
}

/// All mutable per-session state
#[derive(Debug, Clone)]
pub struct SessionState {
    pub song: Option<SongContext>,
    pub bookmarks: BookmarkList,
    pub looping: LoopController,
    pub countdown: CountdownSequencer,
    pub wide: WindowTracker,
    pub narrow: WindowTracker,
    /// Playback rate
    pub speed: f64,
    /// Volume 0-100
    pub volume: u8,
    pub practice: PracticeTimer,
    pub global: GlobalData,
    last_update: Option<Instant>,
}

impl SessionState {
    fn new(config: &PracticeConfig, global: GlobalData) -> Self {
        Self {
            song: None,
            bookmarks: BookmarkList::new(),
            looping: LoopController::new(config.default_countdown_enabled),
            countdown: CountdownSequencer::new(config.countdown_ticks),
            wide: WindowTracker::new(config.wide_window, config.catchup_speed),
            narrow: WindowTracker::new(config.narrow_window, config.catchup_speed),
            speed: 1.0,
            volume: config.default_volume.min(100),
            practice: PracticeTimer::default(),
            global,
            last_update: None,
        }
    }

    pub fn window(&self, kind: WindowKind) -> &WindowTracker {
        match kind {
            WindowKind::Wide => &self.wide,
            WindowKind::Narrow => &self.narrow,
        }
    }
}

/// Practice session over one media engine and one song library
pub struct Session<M, S> {
    config: PracticeConfig,
    media: M,
    library: SongLibrary<S>,
    state: SessionState,
}

impl<M: MediaEngine, S: KeyValueStore> Session<M, S> {
    /// Create a session; global practice data is read from the store
    pub fn new(media: M, store: S, config: PracticeConfig) -> Self {
        let library = SongLibrary::new(store, config.recent_songs_limit);
        let global = library.load_global().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Failed to read global practice data, starting fresh");
            GlobalData::default()
        });
        let state = SessionState::new(&config, global);
        Self {
            config,
            media,
            library,
            state,
        }
    }

    pub fn config(&self) -> &PracticeConfig {
        &self.config
    }

    pub fn media(&self) -> &M {
        &self.media
    }

    pub fn media_mut(&mut self) -> &mut M {
        &mut self.media
    }

    pub fn library(&self) -> &SongLibrary<S> {
        &self.library
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn clock(&self) -> PlaybackClock {
        self.media.clock()
    }

    pub fn song_id(&self) -> Option<&str> {
        self.state.song.as_ref().map(|s| s.id.as_str())
    }

    pub fn is_counting_down(&self) -> bool {
        self.state.countdown.is_active()
    }

    /// Total practice time across all songs, including the running timer
    pub fn practice_time(&self, now: Instant) -> Duration {
        Duration::from_millis(
            self.state.global.total_practice_time + self.state.practice.running_ms(now),
        )
    }

    // ------------------------------------------------------------------
    // Song lifecycle
    // ------------------------------------------------------------------

    /// Bind the session to the track whose metadata just became available.
    ///
    /// Restores stored state for the derived song id, or resets to defaults
    /// for a new song. A previously loaded song is closed first: its practice
    /// time is credited and its record saved before the new state replaces it.
    pub fn load_song(&mut self, file_name: &str, now: Instant) -> Result<LoadOutcome, SessionError> {
        if let Some(previous) = self.state.song.as_ref().map(|s| s.id.clone()) {
            if let Err(e) = self.teardown(now) {
                tracing::warn!(song_id = %previous, error = %e, "Previous song not fully saved");
            }
        }

        let clock = self.media.clock();
        if !clock.has_duration() {
            return Err(SessionError::MetadataNotReady);
        }

        let id = song_id(file_name, clock.duration);
        let stored = self.library.load_song(&id).unwrap_or_else(|e| {
            tracing::warn!(song_id = %id, error = %e, "Stored song state unreadable, using defaults");
            None
        });
        let restored = stored.is_some();
        let record = stored.unwrap_or_else(|| SongRecord {
            volume: self.config.default_volume.min(100),
            countdown_enabled: self.config.default_countdown_enabled,
            ..Default::default()
        });

        self.apply_record(&record);
        self.state.song = Some(SongContext {
            id: id.clone(),
            file_name: file_name.to_string(),
            total_practice_ms: record.total_practice_time,
        });
        self.state.countdown = CountdownSequencer::new(self.config.countdown_ticks);
        self.state.last_update = None;

        let position = self.media.position();
        self.state.wide.recenter(position);
        self.state.narrow.recenter(position);

        if self.media.is_playing() {
            self.state.practice.start(now);
        }

        let bookmark_count = self.state.bookmarks.len();
        if restored {
            tracing::info!(song_id = %id, bookmarks = bookmark_count, "Restored song state");
        } else {
            tracing::info!(song_id = %id, "New song, using defaults");
        }

        Ok(LoadOutcome {
            song_id: id,
            restored,
            bookmark_count,
        })
    }

    /// Snapshot of the persisted part of the session
    pub fn to_record(&self) -> SongRecord {
        let region = self.state.looping.region();
        SongRecord {
            file_name: self.state.song.as_ref().map(|s| s.file_name.clone()),
            bookmarks: self.state.bookmarks.as_slice().to_vec(),
            loop_mode: self.state.looping.is_enabled(),
            loop_start: region.start,
            loop_end: region.end,
            speed: self.state.speed,
            volume: self.state.volume,
            countdown_enabled: self.state.looping.countdown_enabled(),
            last_practiced: Some(Utc::now()),
            total_practice_time: self
                .state
                .song
                .as_ref()
                .map(|s| s.total_practice_ms)
                .unwrap_or(0),
        }
    }

    /// Write song state, the recent list and global data
    pub fn persist(&mut self) -> Result<(), SessionError> {
        let Some(song) = self.state.song.clone() else {
            return Ok(());
        };
        self.write_song(&song).map_err(|e| {
            tracing::warn!(song_id = %song.id, error = %e, "Failed to persist song state");
            SessionError::from(e)
        })
    }

    fn write_song(&mut self, song: &SongContext) -> Result<(), StoreError> {
        let now = Utc::now();
        let record = self.to_record();
        self.library.save_song(&song.id, &record)?;
        self.library.touch_recent(&song.id, &song.file_name, now)?;

        self.state.global.last_session = Some(LastSession {
            file_name: Some(song.file_name.clone()),
            song_id: Some(song.id.clone()),
            timestamp: now,
        });
        self.library.save_global(&self.state.global)
    }

    /// Stop the practice timer and save everything.
    ///
    /// The song record is written even when the global write fails; the
    /// first error is returned.
    pub fn teardown(&mut self, now: Instant) -> Result<(), SessionError> {
        let stopped = self.stop_practice(now);
        let persisted = self.persist();
        stopped.and(persisted)
    }

    fn apply_record(&mut self, record: &SongRecord) {
        let speed = if record.speed.is_finite() && record.speed > 0.0 {
            record.speed
        } else {
            1.0
        };
        let volume = record.volume.min(100);

        self.state.bookmarks = BookmarkList::from(record.bookmarks.clone());
        self.state.looping = LoopController::restore(
            record.loop_mode,
            record.loop_start,
            record.loop_end,
            record.countdown_enabled,
        );
        self.state.speed = speed;
        self.state.volume = volume;
        self.media.set_rate(speed);
        self.media.set_volume(f64::from(volume) / 100.0);
    }

    fn require_song(&self) -> Result<&SongContext, SessionError> {
        self.state.song.as_ref().ok_or(SessionError::NoSongLoaded)
    }

    // ------------------------------------------------------------------
    // Ticks
    // ------------------------------------------------------------------

    /// Handle a position-update notification from the media engine.
    ///
    /// # Returns
    /// The relocation triggered by the loop boundary, if any
    pub fn on_position_update(
        &mut self,
        now: Instant,
        sink: &mut dyn RenderSink,
    ) -> Option<Relocation> {
        let clock = self.media.clock();
        let elapsed = match (clock.playing, self.state.last_update) {
            (true, Some(previous)) => now.saturating_duration_since(previous).as_secs_f64(),
            _ => 0.0,
        };
        self.state.last_update = clock.playing.then_some(now);

        if !clock.has_duration() {
            return None;
        }

        let (wide, narrow) = self.advance_windows(&clock, elapsed);
        self.render(sink, &clock, wide, narrow);

        let relocation = self.state.looping.on_tick(
            clock.position,
            clock.playing,
            self.state.countdown.is_active(),
        )?;
        self.apply_relocation(relocation);
        if matches!(relocation, Relocation::Countdown { .. }) {
            self.refresh(sink);
        }
        Some(relocation)
    }

    /// Advance a running countdown by one tick (driven once per second)
    pub fn on_countdown_tick(&mut self, sink: &mut dyn RenderSink) -> CountdownTick {
        let looping = &mut self.state.looping;
        let tick = self.state.countdown.tick(&mut self.media, |work| match work {
            OnComplete::IncrementIteration => looping.record_iteration(),
        });
        if tick != CountdownTick::Idle {
            self.refresh(sink);
        }
        tick
    }

    /// Recompute and push a frame without elapsed time
    pub fn refresh(&mut self, sink: &mut dyn RenderSink) {
        let clock = self.media.clock();
        if !clock.has_duration() {
            return;
        }
        let (wide, narrow) = self.advance_windows(&clock, 0.0);
        self.render(sink, &clock, wide, narrow);
    }

    fn advance_windows(
        &mut self,
        clock: &PlaybackClock,
        elapsed: f64,
    ) -> (Option<WindowBounds>, Option<WindowBounds>) {
        let wide = self.state.wide.advance(
            clock.position,
            clock.duration,
            clock.playing,
            elapsed,
            clock.rate,
        );
        let narrow = self.state.narrow.advance(
            clock.position,
            clock.duration,
            clock.playing,
            elapsed,
            clock.rate,
        );
        (wide, narrow)
    }

    fn render(
        &self,
        sink: &mut dyn RenderSink,
        clock: &PlaybackClock,
        wide: Option<WindowBounds>,
        narrow: Option<WindowBounds>,
    ) {
        let bookmarks = self.state.bookmarks.as_slice();
        let time_display = if self.state.countdown.is_active() {
            TimeDisplay::Countdown(self.state.countdown.remaining())
        } else {
            TimeDisplay::Clock(clock.position)
        };

        let frame = RenderFrame {
            position: clock.position,
            duration: clock.duration,
            time_display,
            full_percent: (clock.position * 100.0 / clock.duration).clamp(0.0, 100.0),
            wide: wide.and_then(|b| WindowView::new(b, clock.position)),
            narrow: narrow.and_then(|b| WindowView::new(b, clock.position)),
            full_markers: full_track_markers(bookmarks, clock.duration),
            wide_markers: window_markers(bookmarks, wide),
            narrow_markers: window_markers(bookmarks, narrow),
            loop_overlay: loop_overlay(self.state.looping.active_bounds(), clock.duration),
            iteration_count: self.state.looping.iteration_count(),
        };
        sink.render(&frame);
    }

    fn apply_relocation(&mut self, relocation: Relocation) {
        match relocation {
            Relocation::Direct { target } => self.media.set_position(target),
            Relocation::Countdown {
                target,
                on_complete,
            } => {
                self.state
                    .countdown
                    .start(&mut self.media, target, on_complete);
            }
        }
    }

    // ------------------------------------------------------------------
    // Transport
    // ------------------------------------------------------------------

    /// Play/pause button.
    ///
    /// Rejected while the active loop is collapsed; ignored while a
    /// countdown is running.
    pub fn toggle_play(&mut self, now: Instant) -> Result<PlayState, SessionError> {
        self.require_song()?;
        if let Err(LoopError::CollapsedRegion { time }) = self.state.looping.check_playable() {
            tracing::warn!(time, "Playback rejected, loop region is collapsed");
            return Err(SessionError::DegenerateLoop { time });
        }

        if self.media.is_playing() {
            self.media.pause();
            self.stop_practice(now)?;
            Ok(PlayState::Paused)
        } else if self.state.countdown.is_active() {
            tracing::debug!("Play ignored during countdown");
            Ok(PlayState::CountingDown)
        } else {
            self.media.play();
            self.state.practice.start(now);
            Ok(PlayState::Playing)
        }
    }

    fn stop_practice(&mut self, now: Instant) -> Result<(), SessionError> {
        let elapsed = self.state.practice.stop(now);
        if elapsed == 0 {
            return Ok(());
        }
        self.state.global.total_practice_time += elapsed;
        if let Some(song) = self.state.song.as_mut() {
            song.total_practice_ms += elapsed;
        }
        self.library.save_global(&self.state.global).map_err(|e| {
            tracing::warn!(error = %e, "Failed to persist practice time");
            SessionError::from(e)
        })
    }

    /// Seek relative to the playhead, clamped to the track
    pub fn seek_by(&mut self, delta: f64) -> Result<f64, SessionError> {
        self.require_song()?;
        let clock = self.media.clock();
        let target = clock.clamp(clock.position + delta);
        self.media.set_position(target);
        Ok(target)
    }

    /// Jump to an absolute time and re-center both windows on it
    pub fn seek_to(&mut self, seconds: f64) -> Result<f64, SessionError> {
        self.require_song()?;
        let target = self.media.clock().clamp(seconds);
        self.media.set_position(target);
        self.state.wide.recenter(target);
        self.state.narrow.recenter(target);
        Ok(target)
    }

    /// Click on the full track at `fraction` (0.0 to 1.0) of its width
    pub fn click_full_track(&mut self, fraction: f64) -> Result<f64, SessionError> {
        let duration = self.media.duration();
        self.seek_to(fraction.clamp(0.0, 1.0) * duration)
    }

    /// Click inside a zoom window at `fraction` of its width
    pub fn click_window(&mut self, kind: WindowKind, fraction: f64) -> Result<f64, SessionError> {
        self.require_song()?;
        let duration = self.media.duration();
        let bounds = self
            .state
            .window(kind)
            .bounds(duration)
            .ok_or(SessionError::MetadataNotReady)?;
        let target = bounds.time_at(fraction);
        self.media.set_position(target);
        Ok(target)
    }

    /// Back to 0:00, behind a countdown when enabled
    pub fn rewind_to_start(&mut self) -> Result<(), SessionError> {
        self.require_song()?;
        let relocation = if self.state.looping.countdown_enabled() {
            Relocation::Countdown {
                target: 0.0,
                on_complete: None,
            }
        } else {
            Relocation::Direct { target: 0.0 }
        };
        self.apply_relocation(relocation);
        Ok(())
    }

    pub fn set_speed(&mut self, rate: f64) -> Result<(), SessionError> {
        if !rate.is_finite() || rate <= 0.0 {
            return Err(SessionError::InvalidSpeed(rate));
        }
        self.state.speed = rate;
        self.media.set_rate(rate);
        self.persist()
    }

    /// Set volume as a percentage (clamped to 100)
    pub fn set_volume(&mut self, percent: u8) -> Result<(), SessionError> {
        let percent = percent.min(100);
        self.state.volume = percent;
        self.media.set_volume(f64::from(percent) / 100.0);
        self.persist()
    }

    /// Flip the countdown flag, returning the new value
    pub fn toggle_countdown(&mut self) -> Result<bool, SessionError> {
        let enabled = self.state.looping.toggle_countdown();
        self.persist()?;
        Ok(enabled)
    }

    // ------------------------------------------------------------------
    // Bookmarks
    // ------------------------------------------------------------------

    /// Bookmark the current position
    pub fn add_bookmark(&mut self) -> Result<BookmarkId, SessionError> {
        self.require_song()?;
        let id = self.state.bookmarks.add(
            self.media.position(),
            Utc::now(),
            &self.config.default_bookmark_color,
        );
        self.persist()?;
        Ok(id)
    }

    pub fn bookmarks(&self) -> &[Bookmark] {
        self.state.bookmarks.as_slice()
    }

    pub fn jump_to_bookmark(&mut self, id: BookmarkId) -> Result<f64, SessionError> {
        let time = self
            .state
            .bookmarks
            .visit(id)
            .ok_or(SessionError::UnknownBookmark(id))?;
        self.media.set_position(time);
        self.persist()?;
        Ok(time)
    }

    /// Jump to the closest bookmark behind the playhead
    pub fn previous_bookmark(&mut self) -> Result<Option<f64>, SessionError> {
        let position = self.media.position();
        let tolerance = self.config.bookmark_nav_tolerance;
        let Some(time) = self.state.bookmarks.visit_previous(position, tolerance) else {
            return Ok(None);
        };
        self.media.set_position(time);
        self.persist()?;
        Ok(Some(time))
    }

    /// Jump to the closest bookmark ahead of the playhead
    pub fn next_bookmark(&mut self) -> Result<Option<f64>, SessionError> {
        let position = self.media.position();
        let tolerance = self.config.bookmark_nav_tolerance;
        let Some(time) = self.state.bookmarks.visit_next(position, tolerance) else {
            return Ok(None);
        };
        self.media.set_position(time);
        self.persist()?;
        Ok(Some(time))
    }

    pub fn rename_bookmark(&mut self, id: BookmarkId, label: &str) -> Result<(), SessionError> {
        if !self.state.bookmarks.rename(id, label) {
            return Err(SessionError::UnknownBookmark(id));
        }
        self.persist()
    }

    pub fn recolor_bookmark(&mut self, id: BookmarkId, color: &str) -> Result<(), SessionError> {
        if !self.state.bookmarks.recolor(id, color) {
            return Err(SessionError::UnknownBookmark(id));
        }
        self.persist()
    }

    pub fn delete_bookmark(&mut self, id: BookmarkId) -> Result<Bookmark, SessionError> {
        let removed = self
            .state
            .bookmarks
            .remove(id)
            .ok_or(SessionError::UnknownBookmark(id))?;
        self.persist()?;
        Ok(removed)
    }

    // ------------------------------------------------------------------
    // Loop
    // ------------------------------------------------------------------

    /// Loop mode button; returns whether loop mode is now on
    pub fn toggle_loop(&mut self) -> Result<bool, SessionError> {
        self.require_song()?;
        let relocation = self
            .state
            .looping
            .toggle(self.state.bookmarks.as_slice())
            .inspect_err(|e| tracing::warn!(error = %e, "Loop mode not enabled"))?;
        if let Some(relocation) = relocation {
            self.apply_relocation(relocation);
        }
        self.persist()?;
        Ok(self.state.looping.is_enabled())
    }

    /// Use a bookmark's time as a loop boundary
    pub fn set_loop_point(&mut self, id: BookmarkId, point: LoopPoint) -> Result<(), SessionError> {
        let time = self
            .state
            .bookmarks
            .get(id)
            .map(|b| b.time)
            .ok_or(SessionError::UnknownBookmark(id))?;

        if let Some(start) = self.state.looping.set_point(point, time)? {
            self.media.set_position(start);
        }
        self.persist()
    }
}
