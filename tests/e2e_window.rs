//! E2E tests for the playhead-following zoom windows
//!
//! Drives a session with a simulated media engine and checks the window
//! bounds carried by the rendered frames.

use approx::assert_relative_eq;
use practiceloop::playback::window::{WindowBounds, WindowTracker};
use practiceloop::{MediaEngine, MemoryStore, PracticeConfig, RenderFrame, Session, SimulatedMedia};
use std::time::{Duration, Instant};

const TICK: Duration = Duration::from_millis(250);

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter("practiceloop=debug")
        .try_init();
}

fn loaded_session(duration: f64) -> Session<SimulatedMedia, MemoryStore> {
    init_tracing();
    let mut session = Session::new(
        SimulatedMedia::new(duration),
        MemoryStore::new(),
        PracticeConfig::default(),
    );
    session.load_song("scales.mp3", Instant::now()).unwrap();
    session
}

/// Play for `ticks` position updates, advancing the media in step
fn play_ticks(
    session: &mut Session<SimulatedMedia, MemoryStore>,
    frames: &mut Vec<RenderFrame>,
    start: Instant,
    ticks: u32,
) -> Instant {
    let mut now = start;
    for _ in 0..ticks {
        session.media_mut().advance(TICK);
        now += TICK;
        session.on_position_update(now, frames);
    }
    now
}

#[test]
fn test_unset_center_starts_at_playhead() {
    let mut session = loaded_session(300.0);
    session.seek_to(100.0).unwrap();
    let mut frames: Vec<RenderFrame> = Vec::new();
    session.on_position_update(Instant::now(), &mut frames);

    let frame = frames.last().unwrap();
    assert_eq!(
        frame.wide.unwrap().bounds,
        WindowBounds { start: 85.0, end: 115.0 }
    );
    assert_eq!(frame.wide.unwrap().label(), "1:25 - 1:55");
}

#[test]
fn test_windows_follow_playback_smoothly() {
    let mut session = loaded_session(300.0);
    session.seek_to(100.0).unwrap();
    let t0 = Instant::now();
    session.toggle_play(t0).unwrap();

    let mut frames: Vec<RenderFrame> = Vec::new();
    session.on_position_update(t0, &mut frames);
    play_ticks(&mut session, &mut frames, t0, 40);

    // Ten seconds of playback: both windows moved with the playhead
    let position = session.media().position();
    assert_relative_eq!(position, 110.0, epsilon = 1e-9);
    for frame in &frames {
        let wide = frame.wide.unwrap();
        let narrow = frame.narrow.unwrap();
        assert!(wide.bounds.contains(frame.position));
        assert!(narrow.bounds.contains(frame.position));
        assert_relative_eq!(wide.bounds.range(), 30.0, epsilon = 1e-9);
        assert_relative_eq!(narrow.bounds.range(), 10.0, epsilon = 1e-9);
    }
    assert_relative_eq!(session.state().wide.center().unwrap(), 110.0, epsilon = 0.5);
    // The narrow window runs at most one tick ahead of the playhead
    assert_relative_eq!(session.state().narrow.center().unwrap(), 110.25, epsilon = 1e-9);
}

#[test]
fn test_window_follow_scales_with_speed() {
    let mut session = loaded_session(300.0);
    session.set_speed(0.5).unwrap();
    session.seek_to(100.0).unwrap();
    let t0 = Instant::now();
    session.toggle_play(t0).unwrap();

    let mut frames: Vec<RenderFrame> = Vec::new();
    session.on_position_update(t0, &mut frames);
    play_ticks(&mut session, &mut frames, t0, 8);

    assert_relative_eq!(session.media().position(), 101.0, epsilon = 1e-9);
    assert_relative_eq!(session.state().wide.center().unwrap(), 101.0, epsilon = 1e-9);
}

#[test]
fn test_seek_outside_window_snaps() {
    let mut session = loaded_session(300.0);
    session.seek_to(100.0).unwrap();
    let mut frames: Vec<RenderFrame> = Vec::new();
    session.on_position_update(Instant::now(), &mut frames);

    session.seek_by(60.0).unwrap();
    session.on_position_update(Instant::now(), &mut frames);
    assert_eq!(
        frames.last().unwrap().narrow.unwrap().bounds,
        WindowBounds { start: 155.0, end: 165.0 }
    );
}

#[test]
fn test_windows_pinned_at_track_edges() {
    let mut session = loaded_session(240.0);
    let mut frames: Vec<RenderFrame> = Vec::new();

    session.click_full_track(0.0).unwrap();
    session.on_position_update(Instant::now(), &mut frames);
    let frame = frames.last().unwrap();
    assert_eq!(frame.wide.unwrap().bounds, WindowBounds { start: 0.0, end: 30.0 });
    assert_eq!(frame.wide.unwrap().playhead_percent, 0.0);

    session.click_full_track(1.0).unwrap();
    session.on_position_update(Instant::now(), &mut frames);
    let frame = frames.last().unwrap();
    assert_eq!(
        frame.wide.unwrap().bounds,
        WindowBounds { start: 210.0, end: 240.0 }
    );
    assert_eq!(frame.wide.unwrap().playhead_percent, 100.0);
}

#[test]
fn test_short_track_window_spans_track() {
    let mut session = loaded_session(12.0);
    session.seek_to(6.0).unwrap();
    let mut frames: Vec<RenderFrame> = Vec::new();
    session.on_position_update(Instant::now(), &mut frames);

    let frame = frames.last().unwrap();
    assert_eq!(frame.wide.unwrap().bounds, WindowBounds { start: 0.0, end: 12.0 });
    assert_eq!(frame.narrow.unwrap().bounds, WindowBounds { start: 1.0, end: 11.0 });
}

#[test]
fn test_window_width_bounded_for_any_positions() {
    // Deterministic pseudo-random walk over several durations
    let mut seed: u64 = 0x5eed;
    let mut next = move || {
        seed = seed
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        (seed >> 11) as f64 / (1u64 << 53) as f64
    };

    for duration in [5.0, 29.9, 30.0, 45.0, 183.4, 3600.0] {
        let mut tracker = WindowTracker::new(PracticeConfig::default().wide_window, 2.0);
        for _ in 0..500 {
            let position = next() * duration;
            let playing = next() > 0.3;
            let elapsed = next() * 0.5;
            let bounds = tracker
                .advance(position, duration, playing, elapsed, 1.0)
                .unwrap();

            assert!(bounds.start >= 0.0);
            assert!(bounds.end <= duration);
            assert!(bounds.range() <= 30.0 + 1e-9);
            if duration >= 30.0 {
                assert_relative_eq!(bounds.range(), 30.0, epsilon = 1e-9);
            } else {
                assert_relative_eq!(bounds.range(), duration, epsilon = 1e-9);
            }
        }
    }
}

#[test]
fn test_unknown_duration_skips_tick() {
    let mut session = loaded_session(300.0);
    session.media_mut().load(0.0);
    let mut frames: Vec<RenderFrame> = Vec::new();
    session.on_position_update(Instant::now(), &mut frames);
    assert!(frames.is_empty());
}
