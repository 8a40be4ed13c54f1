//! Pause, relocate, count down, resume
//!
//! State machine: `Idle -> Counting(n, n-1, ..., 1) -> Idle`.
//!
//! Starting a countdown pauses playback and moves the playhead to the target
//! immediately, so the display is anchored at the destination while the
//! numbers run down. Ticks are injected by the caller (a timer in the async
//! driver, or a test loop), one per second. A request while `Counting` is
//! ignored: the `Counting` state itself is the mutual-exclusion guard.

use super::clock::MediaEngine;

/// Work to perform when a countdown finishes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnComplete {
    /// Count one more pass through the loop region
    IncrementIteration,
}

/// Countdown state
#[derive(Debug, Clone, PartialEq)]
pub enum CountdownState {
    /// No countdown in progress
    Idle,
    /// Counting down towards resuming at `target`
    Counting {
        /// Ticks left before resuming
        remaining: u32,
        /// Position the playhead was moved to
        target: f64,
        /// Whether playback was active when the countdown started
        resume_after: bool,
        /// Completion work
        on_complete: Option<OnComplete>,
    },
}

/// Outcome of a single tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CountdownTick {
    /// No countdown was running
    Idle,
    /// Still counting; value to display
    Counting { remaining: u32 },
    /// Countdown finished
    Completed {
        target: f64,
        resumed: bool,
        on_complete: Option<OnComplete>,
    },
}

/// Tick-driven countdown sequencer
#[derive(Debug, Clone)]
pub struct CountdownSequencer {
    ticks: u32,
    state: CountdownState,
}

impl CountdownSequencer {
    /// Create an idle sequencer counting down from `ticks` (at least 1)
    pub fn new(ticks: u32) -> Self {
        Self {
            ticks: ticks.max(1),
            state: CountdownState::Idle,
        }
    }

    pub fn state(&self) -> &CountdownState {
        &self.state
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state, CountdownState::Counting { .. })
    }

    /// Ticks left; 0 when idle
    pub fn remaining(&self) -> u32 {
        match self.state {
            CountdownState::Counting { remaining, .. } => remaining,
            CountdownState::Idle => 0,
        }
    }

    /// Target of the running countdown
    pub fn target(&self) -> Option<f64> {
        match self.state {
            CountdownState::Counting { target, .. } => Some(target),
            CountdownState::Idle => None,
        }
    }

    /// Begin a countdown towards `target`.
    ///
    /// Pauses the media if it was playing and seeks to `target` right away.
    ///
    /// # Returns
    /// `false` (and no side effects) when a countdown is already running
    pub fn start<M: MediaEngine + ?Sized>(
        &mut self,
        media: &mut M,
        target: f64,
        on_complete: Option<OnComplete>,
    ) -> bool {
        if self.is_active() {
            tracing::debug!(target, "Countdown already running, request ignored");
            return false;
        }

        let resume_after = media.is_playing();
        if resume_after {
            media.pause();
        }
        media.set_position(target);

        self.state = CountdownState::Counting {
            remaining: self.ticks,
            target,
            resume_after,
            on_complete,
        };
        tracing::info!(target, resume_after, ticks = self.ticks, "Countdown started");
        true
    }

    /// Advance the countdown by one tick.
    ///
    /// On the final tick the sequencer returns to `Idle`, hands the completion
    /// work to `complete` and then resumes playback if it was active when the
    /// countdown began.
    pub fn tick<M, F>(&mut self, media: &mut M, complete: F) -> CountdownTick
    where
        M: MediaEngine + ?Sized,
        F: FnOnce(OnComplete),
    {
        let CountdownState::Counting {
            remaining,
            target,
            resume_after,
            on_complete,
        } = &mut self.state
        else {
            return CountdownTick::Idle;
        };

        *remaining = remaining.saturating_sub(1);
        if *remaining > 0 {
            return CountdownTick::Counting {
                remaining: *remaining,
            };
        }

        let (target, resumed, on_complete) = (*target, *resume_after, *on_complete);
        self.state = CountdownState::Idle;

        if let Some(work) = on_complete {
            complete(work);
        }
        if resumed {
            media.play();
        }
        tracing::info!(target, resumed, "Countdown complete");

        CountdownTick::Completed {
            target,
            resumed,
            on_complete,
        }
    }
}

impl Default for CountdownSequencer {
    fn default() -> Self {
        Self::new(crate::COUNTDOWN_TICKS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::playback::clock::SimulatedMedia;

    fn playing_media(position: f64) -> SimulatedMedia {
        let mut media = SimulatedMedia::new(120.0);
        media.set_position(position);
        media.play();
        media
    }

    #[test]
    fn test_start_pauses_and_relocates() {
        let mut media = playing_media(60.0);
        let mut countdown = CountdownSequencer::default();

        assert!(countdown.start(&mut media, 20.0, None));
        assert!(countdown.is_active());
        assert_eq!(countdown.remaining(), 3);
        assert_eq!(media.position(), 20.0);
        assert!(!media.is_playing());
    }

    #[test]
    fn test_ticks_down_to_completion() {
        let mut media = playing_media(60.0);
        let mut countdown = CountdownSequencer::default();
        countdown.start(&mut media, 20.0, None);

        assert_eq!(
            countdown.tick(&mut media, |_| {}),
            CountdownTick::Counting { remaining: 2 }
        );
        assert_eq!(
            countdown.tick(&mut media, |_| {}),
            CountdownTick::Counting { remaining: 1 }
        );
        assert!(!media.is_playing());

        let last = countdown.tick(&mut media, |_| {});
        assert_eq!(
            last,
            CountdownTick::Completed {
                target: 20.0,
                resumed: true,
                on_complete: None
            }
        );
        assert!(!countdown.is_active());
        assert_eq!(countdown.remaining(), 0);
        assert_eq!(media.position(), 20.0);
        assert!(media.is_playing());
    }

    #[test]
    fn test_does_not_resume_if_paused_before() {
        let mut media = SimulatedMedia::new(120.0);
        let mut countdown = CountdownSequencer::default();
        countdown.start(&mut media, 0.0, None);
        for _ in 0..3 {
            countdown.tick(&mut media, |_| {});
        }
        assert!(!media.is_playing());
    }

    #[test]
    fn test_duplicate_request_ignored() {
        let mut media = playing_media(60.0);
        let mut countdown = CountdownSequencer::default();
        countdown.start(&mut media, 20.0, Some(OnComplete::IncrementIteration));
        countdown.tick(&mut media, |_| {});

        assert!(!countdown.start(&mut media, 45.0, Some(OnComplete::IncrementIteration)));
        assert_eq!(countdown.remaining(), 2);
        assert_eq!(countdown.target(), Some(20.0));
        assert_eq!(media.position(), 20.0);

        let mut completions = 0;
        for _ in 0..5 {
            countdown.tick(&mut media, |_| completions += 1);
        }
        assert_eq!(completions, 1);
    }

    #[test]
    fn test_tick_while_idle() {
        let mut media = SimulatedMedia::new(120.0);
        let mut countdown = CountdownSequencer::default();
        assert_eq!(countdown.tick(&mut media, |_| {}), CountdownTick::Idle);
    }

    #[test]
    fn test_zero_ticks_still_counts_once() {
        let mut media = SimulatedMedia::new(120.0);
        let mut countdown = CountdownSequencer::new(0);
        countdown.start(&mut media, 5.0, None);
        assert_eq!(countdown.remaining(), 1);
        assert!(matches!(
            countdown.tick(&mut media, |_| {}),
            CountdownTick::Completed { .. }
        ));
    }
}
