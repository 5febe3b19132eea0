//! Exhaustive checks for state crossing the persistence boundary: clip
//! extents, unique ids and same-depth overlaps.
//!
//! Interactive edits keep the no-overlap invariant by construction; these
//! scans exist for payloads that may be stale or hand-edited.

use crate::error::{CoreError, Result};
use crate::placement::{ranges_overlap, MIN_VISIBLE_DURATION};
use crate::types::*;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

/// Two clips at the same depth whose visible intervals intersect over
/// `[start, end)`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Violation {
    pub clip_id: Uuid,
    pub overlaps_with_id: Uuid,
    pub start: f64,
    pub end: f64,
}

/// Pairwise scan of one track or layer. Every overlapping pair is reported once.
pub fn validate_track(clips: &[Clip]) -> Vec<Violation> {
    let mut violations = Vec::new();
    for (i, a) in clips.iter().enumerate() {
        for b in &clips[i + 1..] {
            if a.depth != b.depth {
                continue;
            }
            if ranges_overlap(a.timestamp, a.visible_end(), b.timestamp, b.visible_end()) {
                violations.push(Violation {
                    clip_id: a.id,
                    overlaps_with_id: b.id,
                    start: a.timestamp.max(b.timestamp),
                    end: a.visible_end().min(b.visible_end()),
                });
            }
        }
    }
    violations
}

/// Validate the video track and every audio layer.
pub fn validate_timeline(timeline: &Timeline) -> Vec<Violation> {
    let mut violations = validate_track(&timeline.video);
    for layer in &timeline.audio {
        violations.extend(validate_track(&layer.clips));
    }
    violations
}

/// Check every clip's extent and id, then scan for overlaps.
///
/// Bad extents and duplicate ids fail with [`CoreError::InvalidClip`];
/// overlaps fail with [`CoreError::OverlappingClips`] carrying every
/// violation found.
pub fn ensure_valid(timeline: &Timeline) -> Result<()> {
    let mut seen = HashSet::new();
    let all = timeline
        .video
        .iter()
        .chain(timeline.audio.iter().flat_map(|layer| layer.clips.iter()));
    for clip in all {
        check_clip(clip)?;
        if !seen.insert(clip.id) {
            return Err(CoreError::InvalidClip(format!("duplicate clip id {}", clip.id)));
        }
    }

    let violations = validate_timeline(timeline);
    if violations.is_empty() {
        Ok(())
    } else {
        Err(CoreError::OverlappingClips(violations))
    }
}

fn check_clip(clip: &Clip) -> Result<()> {
    check_finite("timestamp", clip.timestamp)
        .and_then(|()| check_extent(clip.duration, clip.trim_start, clip.trim_end))
        .map_err(|e| match e {
            CoreError::InvalidClip(msg) => CoreError::InvalidClip(format!("clip {}: {}", clip.id, msg)),
            other => other,
        })?;
    if clip.timestamp < 0.0 {
        return Err(CoreError::InvalidClip(format!(
            "clip {}: timestamp must not be negative",
            clip.id
        )));
    }
    Ok(())
}

/// Duration must be positive, trims non-negative, and the visible part must
/// exceed [`MIN_VISIBLE_DURATION`].
pub(crate) fn check_extent(duration: f64, trim_start: f64, trim_end: f64) -> Result<()> {
    check_finite("duration", duration)?;
    check_finite("trim_start", trim_start)?;
    check_finite("trim_end", trim_end)?;
    if duration <= 0.0 {
        return Err(CoreError::InvalidClip("duration must be positive".into()));
    }
    if trim_start < 0.0 || trim_end < 0.0 {
        return Err(CoreError::InvalidClip("trim offsets must not be negative".into()));
    }
    let visible = duration - trim_start - trim_end;
    if visible <= MIN_VISIBLE_DURATION {
        return Err(CoreError::InvalidClip(format!(
            "visible duration {:.3}s must exceed {}s",
            visible, MIN_VISIBLE_DURATION
        )));
    }
    Ok(())
}

pub(crate) fn check_finite(field: &str, value: f64) -> Result<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(CoreError::InvalidClip(format!("{} must be finite", field)))
    }
}
