use crate::placement::OVERLAP_EPSILON;
use crate::types::*;

/// Find the nearest snap point within the threshold.
/// Returns the snapped position if within threshold, otherwise the original position.
pub fn find_snap_point(position: f64, snap_points: &[f64], threshold: f64) -> f64 {
    let mut best = position;
    let mut best_dist = f64::INFINITY;

    for &point in snap_points {
        let dist = (position - point).abs();
        if dist < best_dist {
            best = point;
            best_dist = dist;
        }
    }

    if best_dist <= threshold {
        best
    } else {
        position
    }
}

/// Collect all snap points from a timeline: zero plus the visible start and
/// end of every video and audio clip.
pub fn collect_snap_points(timeline: &Timeline, exclude_clip_id: Option<uuid::Uuid>) -> Vec<f64> {
    let mut points = vec![0.0];

    let all_clips = timeline
        .video
        .iter()
        .chain(timeline.audio.iter().flat_map(|l| l.clips.iter()));
    for clip in all_clips {
        if Some(clip.id) == exclude_clip_id {
            continue;
        }
        points.push(clip.timestamp);
        points.push(clip.visible_end());
    }

    points.sort_by(|a, b| a.total_cmp(b));
    points.dedup_by(|a, b| (*a - *b).abs() <= OVERLAP_EPSILON);
    points
}
