use serde::{Deserialize, Serialize};

/// Snapshot of the shared authoritative playhead.
///
/// One instance exists per editing session, mutated by transport controls
/// that live outside this crate. The controller only ever reads snapshots;
/// it never owns or writes this value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlayheadState {
    pub timestamp_ms: f64,
    pub is_playing: bool,
    pub speed: f64,
}

impl PlayheadState {
    pub fn paused_at(timestamp_ms: f64) -> Self {
        Self { timestamp_ms, is_playing: false, speed: 1.0 }
    }

    pub fn playing_at(timestamp_ms: f64) -> Self {
        Self { timestamp_ms, is_playing: true, speed: 1.0 }
    }

    /// Media elements speak seconds; the playhead speaks milliseconds.
    pub fn timestamp_s(&self) -> f64 {
        self.timestamp_ms / 1000.0
    }
}
