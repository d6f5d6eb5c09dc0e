//! Placement validation and nearest-valid-slot search.
//!
//! Every function here is pure: the full working set arrives as arguments,
//! nothing is memoized, nothing is mutated. Intervals are half-open
//! `[start, start + duration)` throughout, so an item ending exactly where
//! another begins does not collide.

use thiserror::Error;

use crate::{TimeMs, TimelineBounds, TimelineItem};

/// Why a placement was refused. Callers treat these as normal outcomes
/// (snap back, show a hint), never as exceptions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PlacementRejection {
    #[error("placement starts before the timeline start")]
    BeforeStart,
    #[error("placement runs past the timeline end")]
    PastEnd,
    #[error("target range is blocked by another item")]
    Blocked,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowDirection {
    Up,
    Down,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Clamped {
    pub start: TimeMs,
    pub was_clamped: bool,
}

fn overlaps(s1: TimeMs, e1: TimeMs, s2: TimeMs, e2: TimeMs) -> bool {
    s1 < e2 && s2 < e1
}

/// True if any item in `row` other than `exclude` intersects `[start, end)`.
pub fn is_range_occupied(
    items: &[TimelineItem],
    row: usize,
    start: TimeMs,
    end: TimeMs,
    exclude: Option<&str>,
) -> bool {
    items.iter().any(|it| {
        it.row_index == row
            && exclude != Some(it.id.as_str())
            && overlaps(start, end, it.start_time, it.collision_end())
    })
}

/// All items in `row` intersecting `[start, end)`, moving item included.
pub fn find_items_in_range(
    items: &[TimelineItem],
    row: usize,
    start: TimeMs,
    end: TimeMs,
) -> Vec<&TimelineItem> {
    items
        .iter()
        .filter(|it| it.row_index == row && overlaps(start, end, it.start_time, it.collision_end()))
        .collect()
}

/// Validate a proposed placement. Checks run in order and short-circuit, so
/// exactly one rejection reason is ever reported.
pub fn can_place_item(
    items: &[TimelineItem],
    moving: &TimelineItem,
    target_row: usize,
    target_start: TimeMs,
    bounds: &TimelineBounds,
) -> Result<(), PlacementRejection> {
    if target_start < bounds.start {
        return Err(PlacementRejection::BeforeStart);
    }
    if target_start + moving.duration > bounds.end {
        return Err(PlacementRejection::PastEnd);
    }
    let end = target_start + moving.collision_duration();
    if is_range_occupied(items, target_row, target_start, end, Some(&moving.id)) {
        return Err(PlacementRejection::Blocked);
    }
    Ok(())
}

/// First free row in `direction`, testing the moving item's current span.
///
/// `Up` is bounded at row 0. `Down` additionally permits `row_count` itself:
/// moving past the last lane spawns a new trailing lane, moving up never
/// fabricates one.
pub fn find_nearest_valid_row(
    items: &[TimelineItem],
    moving: &TimelineItem,
    direction: RowDirection,
    row_count: usize,
) -> Option<usize> {
    let start = moving.start_time;
    let end = moving.collision_end();
    match direction {
        RowDirection::Up => {
            let mut row = moving.row_index;
            while row > 0 {
                row -= 1;
                if !is_range_occupied(items, row, start, end, Some(&moving.id)) {
                    return Some(row);
                }
            }
            None
        }
        RowDirection::Down => {
            for row in (moving.row_index + 1)..=row_count {
                if !is_range_occupied(items, row, start, end, Some(&moving.id)) {
                    return Some(row);
                }
            }
            None
        }
    }
}

/// Nearest start time in `target_row` where the moving item fits without
/// overlap, or `None` if no gap is large enough anywhere within bounds.
///
/// Gaps are enumerated before the first obstacle, between consecutive
/// obstacles, then after the last; each fitting gap contributes the single
/// position in it closest to `desired_start`, and the overall winner is the
/// candidate with the smallest absolute distance. Ties keep the candidate
/// discovered first.
pub fn find_nearest_valid_time(
    items: &[TimelineItem],
    moving: &TimelineItem,
    target_row: usize,
    desired_start: TimeMs,
    bounds: &TimelineBounds,
) -> Option<TimeMs> {
    let duration = moving.collision_duration();

    let mut obstacles: Vec<&TimelineItem> = items
        .iter()
        .filter(|it| it.row_index == target_row && it.id != moving.id)
        .collect();
    obstacles.sort_by_key(|it| it.start_time);

    let mut best: Option<(TimeMs, TimeMs)> = None; // (candidate, distance)
    let mut consider = |gap_start: TimeMs, gap_end: TimeMs| {
        if gap_end - gap_start < duration {
            return;
        }
        let candidate = desired_start.clamp(gap_start, gap_end - duration);
        let distance = (candidate - desired_start).abs();
        if best.map_or(true, |(_, d)| distance < d) {
            best = Some((candidate, distance));
        }
    };

    // Cursor advances with max() so degenerate overlapping obstacle input
    // still yields sane gaps.
    let mut cursor = bounds.start;
    for obstacle in &obstacles {
        let gap_end = obstacle.start_time.min(bounds.end);
        if gap_end > cursor {
            consider(cursor, gap_end);
        }
        cursor = cursor.max(obstacle.collision_end());
    }
    if bounds.end > cursor {
        consider(cursor, bounds.end);
    }

    best.map(|(candidate, _)| candidate)
}

/// Two-sided bounds clamp. Purely geometric, no collision checks, and
/// idempotent even when `duration` exceeds the bounded span.
pub fn clamp_to_bounds(start: TimeMs, duration: TimeMs, bounds: &TimelineBounds) -> Clamped {
    let clamped = start.min(bounds.end - duration).max(bounds.start);
    Clamped {
        start: clamped,
        was_clamped: clamped != start,
    }
}

/// Snap a candidate time to the nearest item edge (start or end) within
/// `threshold`, across all rows. Returns the possibly-snapped time and
/// whether a snap happened.
pub fn snap_to_item_edges(
    items: &[TimelineItem],
    candidate: TimeMs,
    threshold: TimeMs,
    exclude: Option<&str>,
) -> (TimeMs, bool) {
    let mut best_time = candidate;
    let mut best_dist = TimeMs::MAX;
    for it in items {
        if exclude == Some(it.id.as_str()) {
            continue;
        }
        for edge in [it.start_time, it.end_time()] {
            let dist = (candidate - edge).abs();
            if dist <= threshold && dist < best_dist {
                best_dist = dist;
                best_time = edge;
            }
        }
    }
    (best_time, best_dist != TimeMs::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ItemKind;

    fn item(id: &str, start: TimeMs, duration: TimeMs, row: usize) -> TimelineItem {
        TimelineItem {
            id: id.to_string(),
            kind: ItemKind::Video,
            start_time: start,
            duration,
            row_index: row,
            is_locked: false,
            has_real_timestamp: false,
        }
    }

    fn bounds(start: TimeMs, end: TimeMs) -> TimelineBounds {
        TimelineBounds::new(start, end)
    }

    #[test]
    fn test_half_open_adjacency_does_not_collide() {
        let items = vec![item("a", 0, 1000, 0)];
        // B starting exactly where A ends is valid.
        assert!(!is_range_occupied(&items, 0, 1000, 2000, None));
        // One ms of intrusion collides.
        assert!(is_range_occupied(&items, 0, 999, 2000, None));
        // Ending exactly where A starts is valid.
        assert!(!is_range_occupied(&items, 0, -500, 0, None));
    }

    #[test]
    fn test_occupancy_scoped_to_row_and_exclusion() {
        let items = vec![item("a", 0, 1000, 0), item("b", 0, 1000, 1)];
        assert!(is_range_occupied(&items, 0, 500, 600, None));
        assert!(!is_range_occupied(&items, 2, 500, 600, None));
        // The moving item does not block itself.
        assert!(!is_range_occupied(&items, 0, 500, 600, Some("a")));
    }

    #[test]
    fn test_find_items_in_range_includes_self() {
        let items = vec![item("a", 0, 1000, 0), item("b", 3000, 1000, 0)];
        let hits = find_items_in_range(&items, 0, 500, 3500);
        let ids: Vec<&str> = hits.iter().map(|it| it.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn test_point_item_occupies_minimum_span() {
        let items = vec![item("p", 1000, 0, 0)];
        assert!(is_range_occupied(
            &items,
            0,
            1050,
            2000,
            None
        ));
        assert!(!is_range_occupied(&items, 0, 1000 + crate::POINT_COLLISION_MS, 2000, None));
    }

    #[test]
    fn test_can_place_item_reports_first_failure_only() {
        let items = vec![item("a", 0, 1000, 0)];
        let moving = item("m", 0, 2000, 0);
        let b = bounds(0, 10_000);

        // Before-start wins even when the range would also be blocked.
        assert_eq!(
            can_place_item(&items, &moving, 0, -1, &b),
            Err(PlacementRejection::BeforeStart)
        );
        assert_eq!(
            can_place_item(&items, &moving, 0, 9000, &b),
            Err(PlacementRejection::PastEnd)
        );
        assert_eq!(
            can_place_item(&items, &moving, 0, 500, &b),
            Err(PlacementRejection::Blocked)
        );
        assert_eq!(can_place_item(&items, &moving, 0, 1000, &b), Ok(()));
        // Other rows are not obstacles.
        assert_eq!(can_place_item(&items, &moving, 1, 0, &b), Ok(()));
    }

    #[test]
    fn test_nearest_row_down_skips_occupied_and_spawns_trailing_lane() {
        // Rows 0 and 1 occupied at the moving span, row 2 free.
        let items = vec![
            item("a", 0, 5000, 0),
            item("b", 0, 5000, 1),
            item("m", 1000, 1000, 0),
        ];
        let moving = item("m", 1000, 1000, 0);
        assert_eq!(
            find_nearest_valid_row(&items, &moving, RowDirection::Down, 3),
            Some(2)
        );

        // All three rows occupied: down lands on the new trailing lane.
        let items_full = vec![
            item("a", 0, 5000, 0),
            item("b", 0, 5000, 1),
            item("c", 0, 5000, 2),
        ];
        assert_eq!(
            find_nearest_valid_row(&items_full, &moving, RowDirection::Down, 3),
            Some(3)
        );
        // Up from row 0 has nowhere to go and never fabricates a lane.
        assert_eq!(
            find_nearest_valid_row(&items_full, &moving, RowDirection::Up, 3),
            None
        );
    }

    #[test]
    fn test_nearest_row_up_scans_toward_zero() {
        let items = vec![item("a", 0, 5000, 1)];
        let moving = item("m", 1000, 1000, 2);
        assert_eq!(
            find_nearest_valid_row(&items, &moving, RowDirection::Up, 3),
            Some(0)
        );
    }

    #[test]
    fn test_nearest_time_prefers_exact_desired_when_it_fits() {
        let items = vec![item("a", 0, 1000, 0), item("b", 5000, 1000, 0)];
        let moving = item("m", 0, 2000, 0);
        let b = bounds(0, 10_000);
        assert_eq!(
            find_nearest_valid_time(&items, &moving, 0, 2000, &b),
            Some(2000)
        );
    }

    #[test]
    fn test_nearest_time_clamps_into_gap_and_ties_keep_first_gap() {
        let items = vec![item("a", 0, 1000, 0), item("b", 5000, 1000, 0)];
        let moving = item("m", 0, 2000, 0);
        let b = bounds(0, 10_000);
        // Desired 4500 is equidistant from 3000 (gap before "b") and 6000
        // (gap after); the earlier-discovered gap wins, and 3000 + 2000
        // exactly touching "b" is valid under half-open semantics.
        assert_eq!(
            find_nearest_valid_time(&items, &moving, 0, 4500, &b),
            Some(3000)
        );
    }

    #[test]
    fn test_nearest_time_empty_row_clamps_to_bounds() {
        let moving = item("m", 0, 2000, 0);
        let b = bounds(1000, 10_000);
        assert_eq!(find_nearest_valid_time(&[], &moving, 0, 0, &b), Some(1000));
        assert_eq!(
            find_nearest_valid_time(&[], &moving, 0, 9500, &b),
            Some(8000)
        );
        assert_eq!(
            find_nearest_valid_time(&[], &moving, 0, 4000, &b),
            Some(4000)
        );
    }

    #[test]
    fn test_nearest_time_exhausted_returns_none() {
        // Row fully packed, no gap can hold 2000ms.
        let items = vec![item("a", 0, 4500, 0), item("b", 5000, 5000, 0)];
        let moving = item("m", 0, 2000, 0);
        let b = bounds(0, 10_000);
        assert_eq!(find_nearest_valid_time(&items, &moving, 0, 3000, &b), None);
    }

    #[test]
    fn test_nearest_time_never_overlaps_or_escapes_bounds() {
        let items = vec![
            item("a", 1000, 2000, 0),
            item("b", 4000, 500, 0),
            item("c", 7000, 2500, 0),
        ];
        let moving = item("m", 0, 1500, 0);
        let b = bounds(0, 9500);
        for desired in (-2000..12_000).step_by(250) {
            let Some(t) = find_nearest_valid_time(&items, &moving, 0, desired, &b) else {
                continue;
            };
            assert!(t >= b.start && t + moving.collision_duration() <= b.end);
            assert!(!is_range_occupied(
                &items,
                0,
                t,
                t + moving.collision_duration(),
                Some("m")
            ));
        }
    }

    #[test]
    fn test_clamp_is_idempotent() {
        let b = bounds(0, 10_000);
        let first = clamp_to_bounds(-500, 2000, &b);
        assert_eq!(first, Clamped { start: 0, was_clamped: true });
        let second = clamp_to_bounds(first.start, 2000, &b);
        assert_eq!(second, Clamped { start: 0, was_clamped: false });

        let high = clamp_to_bounds(9500, 2000, &b);
        assert_eq!(high, Clamped { start: 8000, was_clamped: true });
        assert!(!clamp_to_bounds(high.start, 2000, &b).was_clamped);

        // Oversized duration resolves stably to the timeline start.
        let oversize = clamp_to_bounds(3000, 20_000, &b);
        assert_eq!(oversize.start, 0);
        assert_eq!(clamp_to_bounds(oversize.start, 20_000, &b).start, 0);
    }

    #[test]
    fn test_snap_to_item_edges_picks_nearest_edge() {
        let items = vec![item("a", 1000, 2000, 0), item("b", 8000, 1000, 1)];
        assert_eq!(snap_to_item_edges(&items, 1040, 100, None), (1000, true));
        assert_eq!(snap_to_item_edges(&items, 2960, 100, None), (3000, true));
        assert_eq!(snap_to_item_edges(&items, 5000, 100, None), (5000, false));
        // The moving item's own edges never attract it.
        assert_eq!(snap_to_item_edges(&items, 1040, 100, Some("a")), (1040, false));
    }
}
