//! Playback tracking module
//!
//! This module contains the time-dependent parts of the engine:
//! - Media engine abstraction and playback clock snapshots ([`clock`])
//! - Smooth playhead-following zoom windows ([`window`])
//! - Loop region bounds and boundary detection ([`looping`])
//! - Tick-driven pause/relocate/resume countdown ([`countdown`])
//! - The session controller tying them together per tick ([`session`])

pub mod clock;
pub mod countdown;
pub mod looping;
pub mod session;
pub mod window;
