//! Playhead-following zoom windows
//!
//! Each window is framed around a center that follows the playhead without
//! jittering. While the playhead sits near the center the window drifts at
//! playback speed; when the playhead runs ahead the window catches up faster
//! than real time; when the playhead falls behind the window waits. A
//! playhead outside the window (a seek) snaps the center immediately.
//!
//! ```text
//!        center - half        center        center + half
//!   ---------[==================|==================]---------
//!                         |<- threshold ->|
//! ```

use crate::config::WindowConfig;

/// Visible time range of a window, in seconds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowBounds {
    pub start: f64,
    pub end: f64,
}

impl WindowBounds {
    /// Width of the visible range in seconds
    pub fn range(&self) -> f64 {
        self.end - self.start
    }

    /// Whether `time` lies inside the window (inclusive)
    pub fn contains(&self, time: f64) -> bool {
        time >= self.start && time <= self.end
    }

    /// Position of `time` across the window as a percentage clamped to `[0, 100]`.
    ///
    /// Returns `None` for a zero-width window.
    pub fn percent_of(&self, time: f64) -> Option<f64> {
        let range = self.range();
        if range <= 0.0 || !range.is_finite() {
            return None;
        }
        Some(((time - self.start) * 100.0 / range).clamp(0.0, 100.0))
    }

    /// Time at `fraction` (0.0 to 1.0) across the window
    pub fn time_at(&self, fraction: f64) -> f64 {
        self.start + fraction.clamp(0.0, 1.0) * self.range()
    }
}

/// Tracks the center of one zoom window
#[derive(Debug, Clone)]
pub struct WindowTracker {
    config: WindowConfig,
    catchup_speed: f64,
    center: Option<f64>,
}

impl WindowTracker {
    /// Create a tracker with an unset center
    pub fn new(config: WindowConfig, catchup_speed: f64) -> Self {
        Self {
            config,
            catchup_speed,
            center: None,
        }
    }

    /// Window width in seconds
    pub fn size(&self) -> f64 {
        self.config.size
    }

    /// Current center, if one has been established
    pub fn center(&self) -> Option<f64> {
        self.center
    }

    /// Forget the center; the next advance re-seeds it from the playhead
    pub fn reset(&mut self) {
        self.center = None;
    }

    /// Hard re-center on `position` (seeks, track clicks, song load)
    pub fn recenter(&mut self, position: f64) {
        self.center = Some(position);
    }

    /// Update the center for one position tick and return the visible bounds.
    ///
    /// # Arguments
    /// * `position` - Current playhead position (seconds)
    /// * `duration` - Track duration (seconds)
    /// * `playing` - Whether playback is active
    /// * `elapsed` - Wall-clock seconds since the previous tick while playing
    /// * `rate` - Playback rate multiplier
    ///
    /// # Returns
    /// `None` when the duration is unusable or the window collapses to zero
    /// width; the caller should hold its previous display.
    pub fn advance(
        &mut self,
        position: f64,
        duration: f64,
        playing: bool,
        elapsed: f64,
        rate: f64,
    ) -> Option<WindowBounds> {
        if !duration.is_finite() || duration <= 0.0 {
            return None;
        }

        let half = self.config.half();
        let position = if position.is_finite() { position } else { 0.0 };
        let mut center = match self.center {
            Some(c) if c.is_finite() => c,
            _ => position,
        };

        let offset = position - center;
        if position < center - half || position > center + half {
            center = position;
        } else if playing && elapsed > 0.0 {
            if offset.abs() <= self.config.center_threshold {
                center += rate * elapsed;
            } else if offset > 0.0 {
                center += rate * self.catchup_speed * elapsed;
            }
        }

        // max after min: short tracks pin the center at `half`
        center = center.min(duration - half).max(half);
        self.center = Some(center);

        let bounds = self.bounds_around(center, duration);
        if bounds.range() == 0.0 {
            return None;
        }
        Some(bounds)
    }

    /// Bounds for the current center without advancing it
    pub fn bounds(&self, duration: f64) -> Option<WindowBounds> {
        if !duration.is_finite() || duration <= 0.0 {
            return None;
        }
        let center = self.center?;
        let bounds = self.bounds_around(center, duration);
        (bounds.range() > 0.0).then_some(bounds)
    }

    fn bounds_around(&self, center: f64, duration: f64) -> WindowBounds {
        let size = self.config.size;
        let half = self.config.half();
        let mut start = (center - half).max(0.0);
        let mut end = (center + half).min(duration);

        if start == 0.0 {
            end = duration.min(size);
        } else if end == duration {
            start = (duration - size).max(0.0);
        }

        WindowBounds { start, end }
    }
}
