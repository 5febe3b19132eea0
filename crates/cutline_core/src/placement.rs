//! Interval placement on a single track.
//!
//! Everything here is a pure function over a clip slice. Depth is an
//! independent sub-lane: clips only conflict with clips at the same depth.

use crate::types::*;
use std::collections::BTreeSet;
use uuid::Uuid;

/// Intersections at or below this length (seconds) are not overlaps.
pub const OVERLAP_EPSILON: f64 = 0.001;

/// Smallest visible duration (seconds) a clip may be trimmed down to.
pub const MIN_VISIBLE_DURATION: f64 = 0.1;

/// True only if `[start_a, end_a)` and `[start_b, end_b)` share more than
/// [`OVERLAP_EPSILON`]. Touching edges never overlap.
pub fn ranges_overlap(start_a: f64, end_a: f64, start_b: f64, end_b: f64) -> bool {
    let intersection = end_a.min(end_b) - start_a.max(start_b);
    intersection > OVERLAP_EPSILON
}

/// Lowest depth at which `[start, end)` collides with no clip.
///
/// Gaps in the occupied depths are reused before a new depth is opened.
pub fn find_available_depth(
    clips: &[Clip],
    start: f64,
    end: f64,
    exclude_id: Option<Uuid>,
) -> u32 {
    let occupied: BTreeSet<u32> = clips
        .iter()
        .filter(|c| Some(c.id) != exclude_id)
        .filter(|c| ranges_overlap(start, end, c.timestamp, c.visible_end()))
        .map(|c| c.depth)
        .collect();

    let mut depth = 0;
    while occupied.contains(&depth) {
        depth += 1;
    }
    depth
}

/// Nearest timestamp to `candidate.timestamp` at which the candidate fits
/// without overlapping any clip at its depth.
///
/// The requested timestamp is returned unchanged (clamped to zero) when it is
/// already free. Otherwise every slot is considered (before the first clip,
/// each gap wide enough, after the last clip) and the closest wins.
pub fn find_nearest_valid_position(
    candidate: &Placement,
    clips: &[Clip],
    exclude_id: Option<Uuid>,
) -> f64 {
    let requested = candidate.timestamp.max(0.0);
    let visible = candidate.visible_duration();

    let mut lane: Vec<&Clip> = clips
        .iter()
        .filter(|c| Some(c.id) != exclude_id && c.depth == candidate.depth)
        .collect();

    let conflicts = lane
        .iter()
        .any(|c| ranges_overlap(requested, requested + visible, c.timestamp, c.visible_end()));
    if !conflicts {
        return requested;
    }

    lane.sort_by(|a, b| a.timestamp.total_cmp(&b.timestamp));

    let mut slots = Vec::with_capacity(lane.len() + 1);

    let first_start = lane[0].timestamp;
    if first_start - visible >= -OVERLAP_EPSILON {
        slots.push(clamp_into(requested, 0.0, first_start - visible));
    }

    let mut gap_start = lane[0].visible_end();
    for clip in &lane[1..] {
        let gap_end = clip.timestamp;
        if gap_end - gap_start >= visible - OVERLAP_EPSILON {
            slots.push(clamp_into(requested, gap_start, gap_end - visible));
        }
        gap_start = gap_start.max(clip.visible_end());
    }

    slots.push(requested.max(gap_start));

    let mut best = requested.max(gap_start);
    let mut best_dist = f64::INFINITY;
    for slot in slots.into_iter().filter(|s| *s >= 0.0) {
        let dist = (slot - requested).abs();
        if dist < best_dist {
            best = slot;
            best_dist = dist;
        }
    }

    tracing::debug!(requested, resolved = best, depth = candidate.depth, "position search");
    best
}

/// Proposed resolution of an overwrite drag: shrink the clip the mover
/// landed in so that it ends where the mover now starts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AutoTrim {
    pub clip_to_trim: Uuid,
    pub new_trim_end: f64,
    pub is_valid: bool,
}

/// Returns `None` when the candidate's start is not strictly inside another
/// clip at its depth. A returned resolution with `is_valid == false` must not
/// be applied; callers fall back to [`find_nearest_valid_position`].
pub fn resolve_auto_trim(
    candidate: &Placement,
    moving_id: Uuid,
    clips: &[Clip],
    min_duration: f64,
) -> Option<AutoTrim> {
    let start = candidate.timestamp;
    let end = candidate.visible_end();

    let target = clips.iter().find(|c| {
        c.id != moving_id
            && c.depth == candidate.depth
            && start > c.timestamp
            && start < c.visible_end() - OVERLAP_EPSILON
    })?;

    let overlap = target.visible_end() - start;
    let new_trim_end = target.trim_end + overlap;
    let trimmed_visible = target.duration - target.trim_start - new_trim_end;

    let blocked = clips.iter().any(|c| {
        c.id != moving_id
            && c.id != target.id
            && c.depth == candidate.depth
            && ranges_overlap(start, end, c.timestamp, c.visible_end())
    });

    Some(AutoTrim {
        clip_to_trim: target.id,
        new_trim_end,
        is_valid: trimmed_visible > min_duration && !blocked,
    })
}

fn clamp_into(value: f64, lo: f64, hi: f64) -> f64 {
    value.max(lo).min(hi.max(lo))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clip_at(timestamp: f64, duration: f64, depth: u32) -> Clip {
        Clip {
            id: Uuid::new_v4(),
            source_id: Uuid::new_v4(),
            timestamp,
            duration,
            trim_start: 0.0,
            trim_end: 0.0,
            depth,
            muted: false,
        }
    }

    // -----------------------------------------------------------------------
    // ranges_overlap
    // -----------------------------------------------------------------------

    #[test]
    fn touching_edges_do_not_overlap() {
        assert!(!ranges_overlap(0.0, 5.0, 5.0, 10.0));
        assert!(!ranges_overlap(5.0, 10.0, 0.0, 5.0));
    }

    #[test]
    fn overlap_beyond_epsilon_detected() {
        assert!(ranges_overlap(0.0, 5.0, 4.999, 10.0));
        assert!(ranges_overlap(0.0, 10.0, 2.0, 3.0));
    }

    #[test]
    fn overlap_within_epsilon_ignored() {
        assert!(!ranges_overlap(0.0, 5.0, 4.9995, 10.0));
    }

    // -----------------------------------------------------------------------
    // find_available_depth
    // -----------------------------------------------------------------------

    #[test]
    fn depth_zero_when_free() {
        let clips = vec![clip_at(0.0, 5.0, 0)];
        assert_eq!(find_available_depth(&clips, 5.0, 8.0, None), 0);
    }

    #[test]
    fn depth_one_when_base_occupied() {
        let clips = vec![clip_at(0.0, 5.0, 0)];
        assert_eq!(find_available_depth(&clips, 2.0, 5.0, None), 1);
    }

    #[test]
    fn depth_fills_gap_in_sequence() {
        let clips = vec![clip_at(0.0, 5.0, 0), clip_at(0.0, 5.0, 2)];
        assert_eq!(find_available_depth(&clips, 0.0, 5.0, None), 1);
    }

    #[test]
    fn depth_ignores_excluded_clip() {
        let own = clip_at(0.0, 5.0, 0);
        let clips = vec![own.clone()];
        assert_eq!(find_available_depth(&clips, 1.0, 4.0, Some(own.id)), 0);
    }

    // -----------------------------------------------------------------------
    // find_nearest_valid_position
    // -----------------------------------------------------------------------

    #[test]
    fn free_position_is_kept() {
        let clips = vec![clip_at(0.0, 5.0, 0), clip_at(10.0, 5.0, 0)];
        let pos = find_nearest_valid_position(&Placement::new(6.0, 3.0), &clips, None);
        assert_eq!(pos, 6.0);
    }

    #[test]
    fn empty_track_clamps_negative_request() {
        let pos = find_nearest_valid_position(&Placement::new(-4.0, 3.0), &[], None);
        assert_eq!(pos, 0.0);
    }

    #[test]
    fn negative_request_never_negative_with_conflicts() {
        let clips = vec![clip_at(0.0, 5.0, 0), clip_at(6.0, 1.0, 0)];
        for requested in [-0.5, -3.0, -100.0] {
            let pos = find_nearest_valid_position(&Placement::new(requested, 2.0), &clips, None);
            assert!(pos >= 0.0, "got {pos} for {requested}");
            assert_eq!(pos, 7.0);
        }
    }

    #[test]
    fn snaps_into_nearest_gap() {
        // Gap [5, 10) fits a 3s clip; request 4 overlaps the first clip.
        let clips = vec![clip_at(0.0, 5.0, 0), clip_at(10.0, 5.0, 0)];
        let pos = find_nearest_valid_position(&Placement::new(4.0, 3.0), &clips, None);
        assert_eq!(pos, 5.0);

        // Request 8.5 overlaps the second clip; latest start in the gap is 7.
        let pos = find_nearest_valid_position(&Placement::new(8.5, 3.0), &clips, None);
        assert_eq!(pos, 7.0);
    }

    #[test]
    fn too_small_gap_is_skipped() {
        let clips = vec![clip_at(0.0, 5.0, 0), clip_at(6.0, 4.0, 0)];
        let pos = find_nearest_valid_position(&Placement::new(5.5, 3.0), &clips, None);
        assert_eq!(pos, 10.0);
    }

    #[test]
    fn slot_before_first_clip() {
        let clips = vec![clip_at(4.0, 5.0, 0)];
        let pos = find_nearest_valid_position(&Placement::new(2.0, 3.0), &clips, None);
        assert_eq!(pos, 1.0);
    }

    #[test]
    fn other_depths_are_invisible() {
        let clips = vec![clip_at(0.0, 10.0, 1)];
        let pos = find_nearest_valid_position(&Placement::new(2.0, 3.0), &clips, None);
        assert_eq!(pos, 2.0);

        let pos = find_nearest_valid_position(&Placement::new(2.0, 3.0).at_depth(1), &clips, None);
        assert_eq!(pos, 10.0);
    }

    #[test]
    fn moving_clip_returns_to_own_slot() {
        let a = clip_at(0.0, 5.0, 0);
        let b = clip_at(5.0, 5.0, 0);
        let clips = vec![a.clone(), b];
        let candidate = Placement { timestamp: 3.0, ..a.placement() };
        let pos = find_nearest_valid_position(&candidate, &clips, Some(a.id));
        assert_eq!(pos, 0.0);
    }

    #[test]
    fn trims_shrink_the_candidate() {
        // 6s source trimmed to 2s visible fits the [5, 7) gap.
        let clips = vec![clip_at(0.0, 5.0, 0), clip_at(7.0, 5.0, 0)];
        let candidate = Placement {
            timestamp: 4.0,
            duration: 6.0,
            trim_start: 2.0,
            trim_end: 2.0,
            depth: 0,
        };
        let pos = find_nearest_valid_position(&candidate, &clips, None);
        assert_eq!(pos, 5.0);
    }

    // -----------------------------------------------------------------------
    // resolve_auto_trim
    // -----------------------------------------------------------------------

    #[test]
    fn auto_trim_shrinks_preceding_clip() {
        let preceding = clip_at(0.0, 5.0, 0);
        let mover = clip_at(20.0, 4.0, 0);
        let clips = vec![preceding.clone(), mover.clone()];
        let candidate = Placement { timestamp: 3.0, ..mover.placement() };

        let trim = resolve_auto_trim(&candidate, mover.id, &clips, MIN_VISIBLE_DURATION).unwrap();
        assert_eq!(trim.clip_to_trim, preceding.id);
        assert_eq!(trim.new_trim_end, 2.0);
        assert!(trim.is_valid);
    }

    #[test]
    fn auto_trim_adds_to_existing_trim_end() {
        let mut preceding = clip_at(0.0, 8.0, 0);
        preceding.trim_end = 1.0;
        let mover = clip_at(20.0, 4.0, 0);
        let clips = vec![preceding.clone(), mover.clone()];
        let candidate = Placement { timestamp: 5.0, ..mover.placement() };

        let trim = resolve_auto_trim(&candidate, mover.id, &clips, MIN_VISIBLE_DURATION).unwrap();
        assert_eq!(trim.new_trim_end, 3.0);
        assert!(trim.is_valid);
    }

    #[test]
    fn auto_trim_invalid_below_floor() {
        let preceding = clip_at(0.0, 5.0, 0);
        let mover = clip_at(20.0, 4.0, 0);
        let clips = vec![preceding, mover.clone()];
        let candidate = Placement { timestamp: 0.05, ..mover.placement() };

        let trim = resolve_auto_trim(&candidate, mover.id, &clips, MIN_VISIBLE_DURATION).unwrap();
        assert!(!trim.is_valid);
    }

    #[test]
    fn auto_trim_invalid_with_downstream_conflict() {
        let preceding = clip_at(0.0, 5.0, 0);
        let downstream = clip_at(6.0, 5.0, 0);
        let mover = clip_at(20.0, 4.0, 0);
        let clips = vec![preceding, downstream, mover.clone()];
        let candidate = Placement { timestamp: 3.0, ..mover.placement() };

        let trim = resolve_auto_trim(&candidate, mover.id, &clips, MIN_VISIBLE_DURATION).unwrap();
        assert!(!trim.is_valid);
    }

    #[test]
    fn touching_start_is_not_an_overwrite() {
        let preceding = clip_at(0.0, 5.0, 0);
        let mover = clip_at(20.0, 4.0, 0);
        let clips = vec![preceding, mover.clone()];
        let candidate = Placement { timestamp: 5.0, ..mover.placement() };

        assert!(resolve_auto_trim(&candidate, mover.id, &clips, MIN_VISIBLE_DURATION).is_none());
    }

    #[test]
    fn auto_trim_ignores_other_depths() {
        let preceding = clip_at(0.0, 5.0, 1);
        let mover = clip_at(20.0, 4.0, 0);
        let clips = vec![preceding, mover.clone()];
        let candidate = Placement { timestamp: 3.0, ..mover.placement() };

        assert!(resolve_auto_trim(&candidate, mover.id, &clips, MIN_VISIBLE_DURATION).is_none());
    }
}
