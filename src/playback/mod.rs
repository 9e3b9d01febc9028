//! Playback module for replaying recordings against a live store.
//!
//! This module provides:
//! - The playback state machine and its status snapshot
//! - An async engine that runs one action at a time with confirmation
//!   gating, pacing, looping, and a progress watchdog
//! - A handle for driving the engine from a CLI or UI

mod engine;
mod session;

pub use engine::{PlaybackEngine, PlaybackHandle};
pub use session::{
    MAX_LOG_ENTRIES, NextStep, PlaybackLogEntry, PlaybackSession, PlaybackState, PlaybackStatus,
    StepOutcome,
};
