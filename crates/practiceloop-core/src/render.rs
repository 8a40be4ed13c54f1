//! Display values pushed to the UI layer
//!
//! The engine computes everything a view needs (window bounds, playhead
//! percentages, marker positions, countdown value) and pushes it to a
//! [`RenderSink`]. Nothing flows back.

use crate::bookmarks::{Bookmark, BookmarkId};
use crate::playback::window::WindowBounds;
use std::fmt;

/// Format seconds as `m:ss`
pub fn format_time(seconds: f64) -> String {
    if !seconds.is_finite() {
        return "0:00".to_string();
    }
    let seconds = seconds.max(0.0);
    let mins = (seconds / 60.0).floor() as u64;
    let secs = (seconds % 60.0).floor() as u64;
    format!("{}:{:02}", mins, secs)
}

/// Main position readout
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TimeDisplay {
    /// Countdown value while counting
    Countdown(u32),
    /// Playhead position in seconds
    Clock(f64),
}

impl fmt::Display for TimeDisplay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeDisplay::Countdown(n) => write!(f, "{}", n),
            TimeDisplay::Clock(t) => f.write_str(&format_time(*t)),
        }
    }
}

/// One zoom window as displayed
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowView {
    pub bounds: WindowBounds,
    /// Playhead position across the window, 0-100
    pub playhead_percent: f64,
}

impl WindowView {
    /// Build a view; `None` for a zero-width window
    pub fn new(bounds: WindowBounds, position: f64) -> Option<Self> {
        Some(Self {
            bounds,
            playhead_percent: bounds.percent_of(position)?,
        })
    }

    /// `"m:ss - m:ss"` label
    pub fn label(&self) -> String {
        format!(
            "{} - {}",
            format_time(self.bounds.start),
            format_time(self.bounds.end)
        )
    }
}

/// A bookmark placed on a track
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerView {
    pub id: BookmarkId,
    pub percent: f64,
    pub color: String,
    pub label: String,
}

/// Loop region highlight on the full track
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoopOverlay {
    pub start_percent: f64,
    pub width_percent: f64,
}

/// Everything the view needs for one refresh
///
/// A `None` window means the window could not be framed this tick and the
/// view should keep showing its previous state.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderFrame {
    pub position: f64,
    pub duration: f64,
    pub time_display: TimeDisplay,
    /// Playhead across the whole track, 0-100
    pub full_percent: f64,
    pub wide: Option<WindowView>,
    pub narrow: Option<WindowView>,
    pub full_markers: Vec<MarkerView>,
    pub wide_markers: Vec<MarkerView>,
    pub narrow_markers: Vec<MarkerView>,
    pub loop_overlay: Option<LoopOverlay>,
    pub iteration_count: u32,
}

impl RenderFrame {
    /// `"m:ss / m:ss"` label for the full track
    pub fn full_label(&self) -> String {
        format!(
            "{} / {}",
            format_time(self.position),
            format_time(self.duration)
        )
    }
}

/// Receiver of computed display values
pub trait RenderSink {
    fn render(&mut self, frame: &RenderFrame);
}

/// Keeps every frame; used by headless hosts and tests
impl RenderSink for Vec<RenderFrame> {
    fn render(&mut self, frame: &RenderFrame) {
        self.push(frame.clone());
    }
}

/// Marker positions across the whole track
pub fn full_track_markers(bookmarks: &[Bookmark], duration: f64) -> Vec<MarkerView> {
    if !duration.is_finite() || duration <= 0.0 {
        return Vec::new();
    }
    bookmarks
        .iter()
        .map(|b| MarkerView {
            id: b.id,
            percent: b.time * 100.0 / duration,
            color: b.color.clone(),
            label: b.label.clone(),
        })
        .collect()
}

/// Marker positions inside a window; bookmarks outside it are hidden
pub fn window_markers(bookmarks: &[Bookmark], bounds: Option<WindowBounds>) -> Vec<MarkerView> {
    let Some(bounds) = bounds else {
        return Vec::new();
    };
    bookmarks
        .iter()
        .filter(|b| bounds.contains(b.time))
        .filter_map(|b| {
            Some(MarkerView {
                id: b.id,
                percent: bounds.percent_of(b.time)?,
                color: b.color.clone(),
                label: b.label.clone(),
            })
        })
        .collect()
}

/// Loop highlight, when a loop with both bounds is active
pub fn loop_overlay(bounds: Option<(f64, f64)>, duration: f64) -> Option<LoopOverlay> {
    let (start, end) = bounds?;
    if !duration.is_finite() || duration <= 0.0 {
        return None;
    }
    let start_percent = start * 100.0 / duration;
    let end_percent = end * 100.0 / duration;
    Some(LoopOverlay {
        start_percent,
        width_percent: end_percent - start_percent,
    })
}
