use crate::error::{CoreError, Result};
use crate::placement::*;
use crate::snapping::{collect_snap_points, find_snap_point};
use crate::types::*;
use crate::validate::{check_extent, check_finite};
use uuid::Uuid;

/// Result of [`Timeline::move_clip`].
#[derive(Debug, Clone, PartialEq)]
pub struct MoveOutcome {
    pub clip: Clip,
    pub auto_trim: Option<AppliedTrim>,
}

/// A neighbour shrunk by an overwrite drag.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AppliedTrim {
    pub clip_id: Uuid,
    pub previous_trim_end: f64,
    pub new_trim_end: f64,
}

/// A clip taken out of the timeline together with where it lived, so it can
/// be put back exactly.
#[derive(Debug, Clone, PartialEq)]
pub struct RemovedClip {
    pub track: TrackRef,
    pub index: usize,
    pub clip: Clip,
}

impl Timeline {
    // -----------------------------------------------------------------------
    // Lookup
    // -----------------------------------------------------------------------

    pub fn clips(&self, track: TrackRef) -> Result<&[Clip]> {
        match track {
            TrackRef::Video => Ok(&self.video),
            TrackRef::Audio(layer_id) => Ok(&self.layer(layer_id)?.clips),
        }
    }

    fn clips_mut(&mut self, track: TrackRef) -> Result<&mut Vec<Clip>> {
        match track {
            TrackRef::Video => Ok(&mut self.video),
            TrackRef::Audio(layer_id) => Ok(&mut self.layer_mut(layer_id)?.clips),
        }
    }

    pub fn layer(&self, layer_id: Uuid) -> Result<&Layer> {
        self.audio
            .iter()
            .find(|l| l.id == layer_id)
            .ok_or(CoreError::LayerNotFound(layer_id))
    }

    fn layer_mut(&mut self, layer_id: Uuid) -> Result<&mut Layer> {
        self.audio
            .iter_mut()
            .find(|l| l.id == layer_id)
            .ok_or(CoreError::LayerNotFound(layer_id))
    }

    pub fn find_clip(&self, clip_id: Uuid) -> Option<(TrackRef, &Clip)> {
        let (track, index) = self.find_clip_location(clip_id)?;
        let clips = self.clips(track).ok()?;
        Some((track, &clips[index]))
    }

    /// Find the (track, index) for a given clip id.
    fn find_clip_location(&self, clip_id: Uuid) -> Option<(TrackRef, usize)> {
        if let Some(index) = self.video.iter().position(|c| c.id == clip_id) {
            return Some((TrackRef::Video, index));
        }
        for layer in &self.audio {
            if let Some(index) = layer.clips.iter().position(|c| c.id == clip_id) {
                return Some((TrackRef::Audio(layer.id), index));
            }
        }
        None
    }

    fn locate(&self, clip_id: Uuid) -> Result<(TrackRef, usize)> {
        self.find_clip_location(clip_id)
            .ok_or(CoreError::ClipNotFound(clip_id))
    }

    // -----------------------------------------------------------------------
    // Layers
    // -----------------------------------------------------------------------

    /// Append an empty audio layer. Returns its id.
    pub fn add_layer(&mut self, name: impl Into<String>) -> Uuid {
        let layer = Layer::new(name);
        let id = layer.id;
        self.audio.push(layer);
        id
    }

    // -----------------------------------------------------------------------
    // Add / remove
    // -----------------------------------------------------------------------

    /// Add a clip, resolving its placement. See [`ClipDescriptor`] for how
    /// depth and timestamp are chosen.
    pub fn add_clip(&mut self, track: TrackRef, descriptor: &ClipDescriptor) -> Result<Clip> {
        self.add_clip_with_id(track, Uuid::new_v4(), descriptor)
    }

    /// Same as [`Timeline::add_clip`] with a caller-chosen id, so that a
    /// replayed add produces an identical clip.
    pub fn add_clip_with_id(
        &mut self,
        track: TrackRef,
        clip_id: Uuid,
        descriptor: &ClipDescriptor,
    ) -> Result<Clip> {
        check_extent(descriptor.duration, descriptor.trim_start, descriptor.trim_end)?;
        check_finite("timestamp", descriptor.timestamp)?;
        if self.find_clip_location(clip_id).is_some() {
            return Err(CoreError::InvalidClip(format!("duplicate clip id {}", clip_id)));
        }

        let candidate = descriptor.placement();
        let clips = self.clips(track)?;
        let (timestamp, depth) = match descriptor.depth {
            Some(depth) => (find_nearest_valid_position(&candidate, clips, None), depth),
            None => {
                let start = candidate.timestamp.max(0.0);
                let end = start + candidate.visible_duration();
                (start, find_available_depth(clips, start, end, None))
            }
        };

        let clip = Clip {
            id: clip_id,
            source_id: descriptor.source_id,
            timestamp,
            duration: descriptor.duration,
            trim_start: descriptor.trim_start,
            trim_end: descriptor.trim_end,
            depth,
            muted: false,
        };
        tracing::debug!(clip_id = %clip.id, %track, timestamp, depth, "clip added");
        self.clips_mut(track)?.push(clip.clone());
        Ok(clip)
    }

    /// Add several clips as one unit. Every descriptor is checked before any
    /// clip is placed, so a bad entry leaves the track untouched.
    pub fn add_clips(
        &mut self,
        track: TrackRef,
        entries: &[(Uuid, ClipDescriptor)],
    ) -> Result<Vec<Clip>> {
        self.clips(track)?;
        for (clip_id, descriptor) in entries {
            check_extent(descriptor.duration, descriptor.trim_start, descriptor.trim_end)?;
            check_finite("timestamp", descriptor.timestamp)?;
            if self.find_clip_location(*clip_id).is_some() {
                return Err(CoreError::InvalidClip(format!("duplicate clip id {}", clip_id)));
            }
        }

        let mut added = Vec::with_capacity(entries.len());
        for (clip_id, descriptor) in entries {
            added.push(self.add_clip_with_id(track, *clip_id, descriptor)?);
        }
        Ok(added)
    }

    /// Put a clip back at `index`. Fails if it would overlap a clip at its depth.
    pub fn insert_clip(&mut self, track: TrackRef, index: usize, clip: Clip) -> Result<()> {
        if self.find_clip_location(clip.id).is_some() {
            return Err(CoreError::InvalidClip(format!("duplicate clip id {}", clip.id)));
        }
        let clips = self.clips_mut(track)?;
        if let Some(other) = first_conflict(&clip.placement(), clips, clip.id) {
            return Err(CoreError::OverlapDetected {
                clip_id: clip.id,
                with_id: other,
            });
        }
        let index = index.min(clips.len());
        clips.insert(index, clip);
        Ok(())
    }

    /// Remove a clip and report where it was.
    pub fn take_clip(&mut self, clip_id: Uuid) -> Result<RemovedClip> {
        let (track, index) = self.locate(clip_id)?;
        let clip = self.clips_mut(track)?.remove(index);
        tracing::debug!(%clip_id, %track, "clip removed");
        Ok(RemovedClip { track, index, clip })
    }

    pub fn remove_clip(&mut self, clip_id: Uuid) -> Result<Clip> {
        self.take_clip(clip_id).map(|removed| removed.clip)
    }

    /// Remove every listed clip, or none of them if any id is unknown.
    /// The returned records are in removal order.
    pub fn remove_clips(&mut self, clip_ids: &[Uuid]) -> Result<Vec<RemovedClip>> {
        for &clip_id in clip_ids {
            self.locate(clip_id)?;
        }
        let mut removed = Vec::with_capacity(clip_ids.len());
        for &clip_id in clip_ids {
            // Duplicate ids in the selection are removed once.
            if self.find_clip_location(clip_id).is_some() {
                removed.push(self.take_clip(clip_id)?);
            }
        }
        Ok(removed)
    }

    // -----------------------------------------------------------------------
    // Move / trim
    // -----------------------------------------------------------------------

    /// Move a clip to `timestamp`, optionally onto another depth.
    ///
    /// A free target is taken as-is. If the clip's new start lands inside a
    /// neighbour, that neighbour is auto-trimmed when the trim is valid;
    /// otherwise the clip goes to the nearest free position in the lane.
    pub fn move_clip(
        &mut self,
        clip_id: Uuid,
        timestamp: f64,
        depth: Option<u32>,
    ) -> Result<MoveOutcome> {
        check_finite("timestamp", timestamp)?;
        let (track, index) = self.locate(clip_id)?;
        let clips = self.clips(track)?;
        let current = &clips[index];

        let mut candidate = current.placement();
        candidate.timestamp = timestamp.max(0.0);
        candidate.depth = depth.unwrap_or(current.depth);

        let mut auto_trim = None;
        if first_conflict(&candidate, clips, clip_id).is_some() {
            match resolve_auto_trim(&candidate, clip_id, clips, MIN_VISIBLE_DURATION) {
                Some(trim) if trim.is_valid => {
                    let neighbour = clips
                        .iter()
                        .find(|c| c.id == trim.clip_to_trim)
                        .ok_or(CoreError::ClipNotFound(trim.clip_to_trim))?;
                    auto_trim = Some(AppliedTrim {
                        clip_id: trim.clip_to_trim,
                        previous_trim_end: neighbour.trim_end,
                        new_trim_end: trim.new_trim_end,
                    });
                }
                _ => {
                    candidate.timestamp = find_nearest_valid_position(&candidate, clips, Some(clip_id));
                }
            }
        }

        let clips = self.clips_mut(track)?;
        if let Some(trim) = &auto_trim {
            if let Some(neighbour) = clips.iter_mut().find(|c| c.id == trim.clip_id) {
                neighbour.trim_end = trim.new_trim_end;
            }
            tracing::debug!(%clip_id, trimmed = %trim.clip_id, new_trim_end = trim.new_trim_end, "overwrite drag auto-trimmed neighbour");
        }

        let clip = &mut clips[index];
        clip.timestamp = candidate.timestamp;
        clip.depth = candidate.depth;
        tracing::debug!(%clip_id, requested = timestamp, resolved = clip.timestamp, depth = clip.depth, "clip moved");

        Ok(MoveOutcome {
            clip: clip.clone(),
            auto_trim,
        })
    }

    /// Change trim offsets and/or the timestamp of a clip. Rejected without
    /// mutation if the visible duration would drop to the floor or the result
    /// would overlap a clip at the same depth.
    pub fn trim_clip(&mut self, clip_id: Uuid, request: TrimRequest) -> Result<Clip> {
        let (track, index) = self.locate(clip_id)?;
        let clips = self.clips(track)?;
        let updated = apply_trim(&clips[index], request)?;

        if let Some(other) = first_conflict(&updated.placement(), clips, clip_id) {
            return Err(CoreError::OverlapDetected {
                clip_id,
                with_id: other,
            });
        }

        let clips = self.clips_mut(track)?;
        clips[index] = updated.clone();
        tracing::debug!(%clip_id, trim_start = updated.trim_start, trim_end = updated.trim_end, "clip trimmed");
        Ok(updated)
    }

    /// Overwrite a clip with a previously captured copy of itself.
    pub fn restore_clip(&mut self, snapshot: &Clip) -> Result<()> {
        let (track, index) = self.locate(snapshot.id)?;
        self.clips_mut(track)?[index] = snapshot.clone();
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Live preview (no placement resolution, no history)
    // -----------------------------------------------------------------------

    /// Reposition a clip during a drag. The clip may temporarily overlap its
    /// neighbours; the committed move command resolves the final placement.
    pub fn preview_move(
        &mut self,
        clip_id: Uuid,
        timestamp: f64,
        depth: Option<u32>,
        snap_threshold: Option<f64>,
    ) -> Result<Clip> {
        check_finite("timestamp", timestamp)?;
        let (track, index) = self.locate(clip_id)?;
        let mut timestamp = timestamp.max(0.0);
        if let Some(threshold) = snap_threshold {
            let points = collect_snap_points(self, Some(clip_id));
            timestamp = find_snap_point(timestamp, &points, threshold);
        }

        let clip = &mut self.clips_mut(track)?[index];
        clip.timestamp = timestamp;
        if let Some(depth) = depth {
            clip.depth = depth;
        }
        Ok(clip.clone())
    }

    /// Adjust trims during a drag. Extents are still checked; overlaps are not.
    pub fn preview_trim(&mut self, clip_id: Uuid, request: TrimRequest) -> Result<Clip> {
        let (track, index) = self.locate(clip_id)?;
        let clips = self.clips_mut(track)?;
        let updated = apply_trim(&clips[index], request)?;
        clips[index] = updated.clone();
        Ok(updated)
    }

    // -----------------------------------------------------------------------
    // Mute
    // -----------------------------------------------------------------------

    /// Flip a layer's mute flag. Returns the new value.
    pub fn toggle_layer_mute(&mut self, layer_id: Uuid) -> Result<bool> {
        let layer = self.layer_mut(layer_id)?;
        layer.muted = !layer.muted;
        Ok(layer.muted)
    }

    /// Flip a single clip's mute flag. Returns the new value.
    pub fn toggle_clip_mute(&mut self, clip_id: Uuid) -> Result<bool> {
        let (track, index) = self.locate(clip_id)?;
        let clip = &mut self.clips_mut(track)?[index];
        clip.muted = !clip.muted;
        Ok(clip.muted)
    }
}

/// Id of the first clip at the candidate's depth that it overlaps.
fn first_conflict(candidate: &Placement, clips: &[Clip], exclude_id: Uuid) -> Option<Uuid> {
    clips
        .iter()
        .find(|c| {
            c.id != exclude_id
                && c.depth == candidate.depth
                && ranges_overlap(
                    candidate.timestamp,
                    candidate.visible_end(),
                    c.timestamp,
                    c.visible_end(),
                )
        })
        .map(|c| c.id)
}

fn apply_trim(clip: &Clip, request: TrimRequest) -> Result<Clip> {
    let mut updated = clip.clone();
    if let Some(trim_start) = request.trim_start {
        updated.trim_start = trim_start;
    }
    if let Some(trim_end) = request.trim_end {
        updated.trim_end = trim_end;
    }
    if let Some(timestamp) = request.timestamp {
        check_finite("timestamp", timestamp)?;
        if timestamp < 0.0 {
            return Err(CoreError::InvalidClip("timestamp must not be negative".into()));
        }
        updated.timestamp = timestamp;
    }
    check_extent(updated.duration, updated.trim_start, updated.trim_end)?;
    Ok(updated)
}
