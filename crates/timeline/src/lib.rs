//! Timeline data model and placement engine for the review workstation.
//!
//! Items are plain records owned by the session/evidence model; this crate
//! never mutates them. All placement questions go through [`collision`],
//! which is pure and safe to call on every pointer-move.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod collision;

pub use collision::{
    can_place_item, clamp_to_bounds, find_items_in_range, find_nearest_valid_row,
    find_nearest_valid_time, is_range_occupied, snap_to_item_edges, Clamped, PlacementRejection,
    RowDirection,
};

pub type TimeMs = i64; // signed milliseconds, offset from session start

/// Occupancy span assigned to instantaneous items. Affects collision tests
/// only; visual width may differ.
pub const POINT_COLLISION_MS: TimeMs = 100;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Video,
    Audio,
    Photo,
}

/// One placed media/evidence element on the timeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineItem {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: ItemKind,
    pub start_time: TimeMs,
    pub duration: TimeMs,
    pub row_index: usize,
    /// Locked items still count as obstacles but must not be moved.
    #[serde(default)]
    pub is_locked: bool,
    /// Items with true provenance timestamps are not eligible for horizontal
    /// repositioning; callers refuse the move, the engine does not.
    #[serde(default)]
    pub has_real_timestamp: bool,
}

impl TimelineItem {
    pub fn new(kind: ItemKind, start_time: TimeMs, duration: TimeMs, row_index: usize) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            kind,
            start_time,
            duration,
            row_index,
            is_locked: false,
            has_real_timestamp: false,
        }
    }

    pub fn end_time(&self) -> TimeMs {
        self.start_time + self.duration
    }

    /// Span used for occupancy tests; point items take a fixed minimum width.
    pub fn collision_duration(&self) -> TimeMs {
        self.duration.max(POINT_COLLISION_MS)
    }

    pub fn collision_end(&self) -> TimeMs {
        self.start_time + self.collision_duration()
    }
}

/// Outer envelope no item may exceed. Supplied per call, never stored.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TimelineBounds {
    pub start: TimeMs,
    pub end: TimeMs,
}

impl TimelineBounds {
    pub const fn new(start: TimeMs, end: TimeMs) -> Self {
        Self { start, end }
    }

    pub fn span(&self) -> TimeMs {
        self.end - self.start
    }
}

/// Lanes are a dense gapless enumeration per section.
pub fn row_count(items: &[TimelineItem]) -> usize {
    items.iter().map(|it| it.row_index + 1).max().unwrap_or(0)
}
