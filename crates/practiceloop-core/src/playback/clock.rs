//! Media engine abstraction
//!
//! The engine never owns ground-truth time. It reads position, duration,
//! rate and play state from a [`MediaEngine`] and mutates them only through
//! explicit seek/play/pause calls.

use std::time::Duration;

/// Snapshot of the media engine's timing state
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaybackClock {
    /// Current playhead position in seconds
    pub position: f64,
    /// Track duration in seconds (NaN or 0 while metadata is loading)
    pub duration: f64,
    /// Playback rate multiplier
    pub rate: f64,
    /// Whether the media is currently playing
    pub playing: bool,
}

impl PlaybackClock {
    /// True once the duration is a usable positive number
    pub fn has_duration(&self) -> bool {
        self.duration.is_finite() && self.duration > 0.0
    }

    /// Clamp a time into `[0, duration]`
    pub fn clamp(&self, seconds: f64) -> f64 {
        if self.has_duration() {
            seconds.clamp(0.0, self.duration)
        } else {
            seconds.max(0.0)
        }
    }
}

/// Host media player operations consumed by the engine
pub trait MediaEngine {
    fn position(&self) -> f64;
    fn set_position(&mut self, seconds: f64);
    fn duration(&self) -> f64;
    fn rate(&self) -> f64;
    fn set_rate(&mut self, rate: f64);
    /// Volume in `[0.0, 1.0]`
    fn volume(&self) -> f64;
    fn set_volume(&mut self, volume: f64);
    fn is_playing(&self) -> bool;
    fn play(&mut self);
    fn pause(&mut self);

    /// Let an engine without its own clock move the playhead by `elapsed`
    /// wall-clock time. Engines that run on their own ignore it.
    fn poll(&mut self, _elapsed: Duration) {}

    /// Capture the current timing state
    fn clock(&self) -> PlaybackClock {
        PlaybackClock {
            position: self.position(),
            duration: self.duration(),
            rate: self.rate(),
            playing: self.is_playing(),
        }
    }
}

/// Deterministic in-memory media engine
///
/// Position only moves when [`SimulatedMedia::advance`] is called, which makes
/// it suitable for headless hosts and for driving the engine in tests.
#[derive(Debug, Clone)]
pub struct SimulatedMedia {
    position: f64,
    duration: f64,
    rate: f64,
    volume: f64,
    playing: bool,
}

impl SimulatedMedia {
    /// Create a paused engine at position 0 for a track of `duration` seconds
    pub fn new(duration: f64) -> Self {
        Self {
            position: 0.0,
            duration,
            rate: 1.0,
            volume: 1.0,
            playing: false,
        }
    }

    /// Create an engine with metadata not yet loaded
    pub fn unloaded() -> Self {
        Self::new(f64::NAN)
    }

    /// Simulate metadata arriving for a freshly loaded track
    pub fn load(&mut self, duration: f64) {
        self.duration = duration;
        self.position = 0.0;
        self.playing = false;
    }

    /// Move the playhead forward by `elapsed` wall-clock time at the current rate.
    ///
    /// Playback stops when the end of the track is reached.
    pub fn advance(&mut self, elapsed: Duration) {
        if !self.playing || !self.clock().has_duration() {
            return;
        }
        self.position += self.rate * elapsed.as_secs_f64();
        if self.position >= self.duration {
            self.position = self.duration;
            self.playing = false;
        }
    }
}

impl Default for SimulatedMedia {
    fn default() -> Self {
        Self::unloaded()
    }
}

impl MediaEngine for SimulatedMedia {
    fn position(&self) -> f64 {
        self.position
    }

    fn set_position(&mut self, seconds: f64) {
        self.position = self.clock().clamp(seconds);
    }

    fn duration(&self) -> f64 {
        self.duration
    }

    fn rate(&self) -> f64 {
        self.rate
    }

    fn set_rate(&mut self, rate: f64) {
        self.rate = rate;
    }

    fn volume(&self) -> f64 {
        self.volume
    }

    fn set_volume(&mut self, volume: f64) {
        self.volume = volume.clamp(0.0, 1.0);
    }

    fn is_playing(&self) -> bool {
        self.playing
    }

    fn play(&mut self) {
        self.playing = true;
    }

    fn pause(&mut self) {
        self.playing = false;
    }

    fn poll(&mut self, elapsed: Duration) {
        self.advance(elapsed);
    }
}
