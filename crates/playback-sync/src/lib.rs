//! Playback synchronization for the review workstation.
//!
//! Keeps one playback-capable element tracking the shared playhead clock
//! without fighting the user during scrubs, flickering on micro-seeks, or
//! flashing a spinner on fast seeks. The controller owns no clock and no
//! element; the host injects a [`PlayheadState`] snapshot and a
//! [`MediaElement`] handle on every frame, so the whole state machine is
//! drivable from tests with fakes.

pub mod clock;
pub mod controller;
pub mod element;

pub use clock::PlayheadState;
pub use controller::{ElementCommand, Phase, SyncConfig, SyncController};
pub use element::{MediaElement, PlaybackRejected};
