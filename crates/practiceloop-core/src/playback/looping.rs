//! Loop region bounds and boundary detection
//!
//! The controller is pure state: it never touches the media engine. Every
//! operation that needs the playhead moved returns a [`Relocation`] for the
//! session to apply, either a direct seek or a countdown-gated one.

use super::countdown::OnComplete;
use crate::bookmarks::Bookmark;
use thiserror::Error;

/// Errors that can occur while configuring a loop
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LoopError {
    #[error("Add at least 2 bookmarks to use loop mode (found {found})")]
    InsufficientBookmarks { found: usize },

    #[error("Loop start and end cannot be at the same position ({time:.2}s)")]
    CollapsedRegion { time: f64 },
}

/// Which boundary of the loop to assign
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopPoint {
    Start,
    End,
}

/// Playhead move requested by the loop controller
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Relocation {
    /// Seek immediately
    Direct { target: f64 },
    /// Seek behind a countdown
    Countdown {
        target: f64,
        on_complete: Option<OnComplete>,
    },
}

impl Relocation {
    pub fn target(&self) -> f64 {
        match *self {
            Relocation::Direct { target } | Relocation::Countdown { target, .. } => target,
        }
    }
}

/// Loop boundaries and pass counter
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoopRegion {
    pub start: Option<f64>,
    pub end: Option<f64>,
    /// Completed passes since the bounds were last set
    pub iteration_count: u32,
}

impl LoopRegion {
    /// Both bounds, when set
    pub fn bounds(&self) -> Option<(f64, f64)> {
        Some((self.start?, self.end?))
    }
}

/// Loop mode state machine
#[derive(Debug, Clone, Default)]
pub struct LoopController {
    enabled: bool,
    countdown_enabled: bool,
    region: LoopRegion,
}

impl LoopController {
    pub fn new(countdown_enabled: bool) -> Self {
        Self {
            enabled: false,
            countdown_enabled,
            region: LoopRegion::default(),
        }
    }

    /// Rebuild from persisted values; the pass counter starts over
    pub fn restore(
        enabled: bool,
        start: Option<f64>,
        end: Option<f64>,
        countdown_enabled: bool,
    ) -> Self {
        Self {
            enabled,
            countdown_enabled,
            region: LoopRegion {
                start,
                end,
                iteration_count: 0,
            },
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn region(&self) -> &LoopRegion {
        &self.region
    }

    pub fn iteration_count(&self) -> u32 {
        self.region.iteration_count
    }

    pub fn countdown_enabled(&self) -> bool {
        self.countdown_enabled
    }

    pub fn set_countdown_enabled(&mut self, enabled: bool) {
        self.countdown_enabled = enabled;
    }

    /// Flip the countdown flag, returning the new value
    pub fn toggle_countdown(&mut self) -> bool {
        self.countdown_enabled = !self.countdown_enabled;
        self.countdown_enabled
    }

    /// Active bounds: loop enabled and both bounds set
    pub fn active_bounds(&self) -> Option<(f64, f64)> {
        if self.enabled {
            self.region.bounds()
        } else {
            None
        }
    }

    /// Switch loop mode.
    ///
    /// Enabling takes the first two bookmarks in time order as the bounds,
    /// resets the pass counter and asks for a move to the start. Disabling
    /// clears the bounds but leaves the counter at its last value.
    pub fn toggle(&mut self, bookmarks: &[Bookmark]) -> Result<Option<Relocation>, LoopError> {
        if self.enabled {
            self.enabled = false;
            self.region.start = None;
            self.region.end = None;
            tracing::info!(
                iterations = self.region.iteration_count,
                "Loop mode disabled"
            );
            return Ok(None);
        }

        if bookmarks.len() < 2 {
            return Err(LoopError::InsufficientBookmarks {
                found: bookmarks.len(),
            });
        }

        let mut times: Vec<f64> = bookmarks.iter().map(|b| b.time).collect();
        times.sort_by(f64::total_cmp);

        self.enabled = true;
        self.region.start = Some(times[0]);
        self.region.end = Some(times[1]);
        self.region.iteration_count = 0;
        tracing::info!(start = times[0], end = times[1], "Loop mode enabled");

        Ok(Some(self.relocate_to(times[0], None)))
    }

    pub fn set_start(&mut self, time: f64) -> Result<Option<f64>, LoopError> {
        self.set_point(LoopPoint::Start, time)
    }

    pub fn set_end(&mut self, time: f64) -> Result<Option<f64>, LoopError> {
        self.set_point(LoopPoint::End, time)
    }

    /// Assign one boundary.
    ///
    /// A value equal to the opposite boundary is rejected and the assigned
    /// boundary is cleared. Otherwise the bounds are swapped if out of order
    /// and the pass counter resets.
    ///
    /// # Returns
    /// The loop start to seek to once both bounds are set
    pub fn set_point(&mut self, point: LoopPoint, time: f64) -> Result<Option<f64>, LoopError> {
        let (slot, other) = match point {
            LoopPoint::Start => (&mut self.region.start, self.region.end),
            LoopPoint::End => (&mut self.region.end, self.region.start),
        };

        if other == Some(time) {
            *slot = None;
            tracing::warn!(?point, time, "Rejected loop point equal to the opposite bound");
            return Err(LoopError::CollapsedRegion { time });
        }
        *slot = Some(time);

        if let (Some(start), Some(end)) = (self.region.start, self.region.end) {
            if start > end {
                self.region.start = Some(end);
                self.region.end = Some(start);
            }
        }
        self.region.iteration_count = 0;

        Ok(self.region.bounds().map(|(start, _)| start))
    }

    /// Reject playback while the region is collapsed
    pub fn check_playable(&self) -> Result<(), LoopError> {
        match self.active_bounds() {
            Some((start, end)) if start == end => Err(LoopError::CollapsedRegion { time: start }),
            _ => Ok(()),
        }
    }

    /// Inspect a fresh playhead position.
    ///
    /// Fires when the loop is active, playback is running, no countdown is
    /// in flight and the playhead has reached the end bound. Without the
    /// countdown the pass is counted immediately; with it the pass is
    /// counted when the countdown completes.
    pub fn on_tick(
        &mut self,
        position: f64,
        playing: bool,
        countdown_active: bool,
    ) -> Option<Relocation> {
        if !playing || countdown_active {
            return None;
        }
        let (start, end) = self.active_bounds()?;
        if position < end {
            return None;
        }

        tracing::debug!(position, start, end, "Loop end reached");
        if self.countdown_enabled {
            Some(self.relocate_to(start, Some(OnComplete::IncrementIteration)))
        } else {
            self.record_iteration();
            Some(Relocation::Direct { target: start })
        }
    }

    /// Count one completed pass
    pub fn record_iteration(&mut self) {
        self.region.iteration_count += 1;
    }

    fn relocate_to(&self, target: f64, on_complete: Option<OnComplete>) -> Relocation {
        if self.countdown_enabled {
            Relocation::Countdown {
                target,
                on_complete,
            }
        } else {
            Relocation::Direct { target }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bookmark(id: u64, time: f64) -> Bookmark {
        Bookmark {
            id,
            time,
            label: format!("Bookmark {}", id),
            color: "#ef4444".to_string(),
            play_count: 0,
        }
    }

    #[test]
    fn test_toggle_requires_two_bookmarks() {
        let mut controller = LoopController::new(false);
        let result = controller.toggle(&[bookmark(1, 5.0)]);
        assert_eq!(result, Err(LoopError::InsufficientBookmarks { found: 1 }));
        assert!(!controller.is_enabled());
        assert_eq!(controller.region().start, None);
    }

    #[test]
    fn test_toggle_uses_first_two_by_time() {
        let mut controller = LoopController::new(false);
        let marks = [bookmark(1, 40.0), bookmark(2, 12.0), bookmark(3, 25.0)];
        let relocation = controller.toggle(&marks).unwrap();
        assert_eq!(relocation, Some(Relocation::Direct { target: 12.0 }));
        assert_eq!(controller.active_bounds(), Some((12.0, 25.0)));
    }

    #[test]
    fn test_toggle_with_countdown_gates_relocation() {
        let mut controller = LoopController::new(true);
        let relocation = controller
            .toggle(&[bookmark(1, 10.0), bookmark(2, 20.0)])
            .unwrap();
        assert_eq!(
            relocation,
            Some(Relocation::Countdown {
                target: 10.0,
                on_complete: None
            })
        );
    }

    #[test]
    fn test_disable_freezes_iteration_count() {
        let mut controller = LoopController::new(false);
        let marks = [bookmark(1, 10.0), bookmark(2, 20.0)];
        controller.toggle(&marks).unwrap();
        controller.on_tick(20.0, true, false);
        controller.on_tick(20.1, true, false);
        assert_eq!(controller.toggle(&marks), Ok(None));
        assert_eq!(controller.iteration_count(), 2);
        assert_eq!(controller.region().bounds(), None);

        // Re-enabling starts a fresh count
        controller.toggle(&marks).unwrap();
        assert_eq!(controller.iteration_count(), 0);
    }

    #[test]
    fn test_equal_points_rejected_either_order() {
        let mut controller = LoopController::new(false);
        controller.set_start(10.0).unwrap();
        assert_eq!(
            controller.set_end(10.0),
            Err(LoopError::CollapsedRegion { time: 10.0 })
        );
        assert_eq!(controller.region().end, None);
        assert_eq!(controller.region().start, Some(10.0));

        let mut controller = LoopController::new(false);
        controller.set_end(10.0).unwrap();
        assert!(controller.set_start(10.0).is_err());
        assert_eq!(controller.region().start, None);
        assert_eq!(controller.region().end, Some(10.0));
    }

    #[test]
    fn test_out_of_order_points_swap() {
        let mut controller = LoopController::new(false);
        assert_eq!(controller.set_start(30.0), Ok(None));
        assert_eq!(controller.set_end(15.0), Ok(Some(15.0)));
        assert_eq!(controller.region().bounds(), Some((15.0, 30.0)));
    }

    #[test]
    fn test_set_point_resets_iterations() {
        let mut controller = LoopController::new(false);
        controller
            .toggle(&[bookmark(1, 10.0), bookmark(2, 20.0)])
            .unwrap();
        controller.on_tick(21.0, true, false);
        assert_eq!(controller.iteration_count(), 1);
        controller.set_end(25.0).unwrap();
        assert_eq!(controller.iteration_count(), 0);
    }

    #[test]
    fn test_on_tick_direct_counts_immediately() {
        let mut controller = LoopController::new(false);
        controller
            .toggle(&[bookmark(1, 20.0), bookmark(2, 60.0)])
            .unwrap();
        assert_eq!(controller.on_tick(59.9, true, false), None);
        assert_eq!(
            controller.on_tick(60.0, true, false),
            Some(Relocation::Direct { target: 20.0 })
        );
        assert_eq!(controller.iteration_count(), 1);
    }

    #[test]
    fn test_on_tick_countdown_defers_count() {
        let mut controller = LoopController::new(true);
        controller
            .toggle(&[bookmark(1, 20.0), bookmark(2, 60.0)])
            .unwrap();
        assert_eq!(
            controller.on_tick(60.2, true, false),
            Some(Relocation::Countdown {
                target: 20.0,
                on_complete: Some(OnComplete::IncrementIteration)
            })
        );
        assert_eq!(controller.iteration_count(), 0);
    }

    #[test]
    fn test_on_tick_guards() {
        let mut controller = LoopController::new(false);
        controller
            .toggle(&[bookmark(1, 20.0), bookmark(2, 60.0)])
            .unwrap();
        assert_eq!(controller.on_tick(61.0, false, false), None);
        assert_eq!(controller.on_tick(61.0, true, true), None);
        assert_eq!(controller.iteration_count(), 0);

        let mut idle = LoopController::new(false);
        idle.set_start(1.0).unwrap();
        idle.set_end(2.0).unwrap();
        // Bounds set but loop mode off
        assert_eq!(idle.on_tick(5.0, true, false), None);
    }

    #[test]
    fn test_collapsed_region_blocks_playback() {
        let controller = LoopController::restore(true, Some(8.0), Some(8.0), false);
        assert_eq!(
            controller.check_playable(),
            Err(LoopError::CollapsedRegion { time: 8.0 })
        );
        let controller = LoopController::restore(true, Some(8.0), Some(9.0), false);
        assert!(controller.check_playable().is_ok());
    }

    #[test]
    fn test_toggle_countdown() {
        let mut controller = LoopController::new(true);
        assert!(!controller.toggle_countdown());
        assert!(controller.toggle_countdown());
    }
}
