//! Reversible timeline edits.
//!
//! Each edit kind carries whatever it needs to be undone exactly. Values that
//! can only be known once the edit has run (a removed clip's index, the
//! neighbour an overwrite drag trimmed, the clip a move or trim produced) are
//! captured on the first execute; redo restores them instead of recomputing.

use crate::editing::{AppliedTrim, RemovedClip};
use crate::error::{CoreError, Result};
use crate::types::*;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    id: Uuid,
    kind: CommandKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CommandKind {
    AddClip {
        track: TrackRef,
        clip_id: Uuid,
        descriptor: ClipDescriptor,
    },
    RemoveClip {
        clip_id: Uuid,
        removed: Option<RemovedClip>,
    },
    MoveClip {
        clip_id: Uuid,
        timestamp: f64,
        depth: Option<u32>,
        before: Clip,
        after: Option<Clip>,
        auto_trim: Option<AppliedTrim>,
    },
    TrimClip {
        clip_id: Uuid,
        request: TrimRequest,
        before: Clip,
        after: Option<Clip>,
    },
    ToggleLayerMute {
        layer_id: Uuid,
    },
    ToggleClipMute {
        clip_id: Uuid,
    },
    RemoveClips {
        clip_ids: Vec<Uuid>,
        removed: Vec<RemovedClip>,
    },
    PasteClips {
        track: TrackRef,
        entries: Vec<(Uuid, ClipDescriptor)>,
    },
    Batch {
        description: String,
        before: Timeline,
        after: Timeline,
    },
}

impl Command {
    fn from_kind(kind: CommandKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
        }
    }

    /// The new clip's id is fixed here so that redo recreates the same clip.
    pub fn add_clip(track: TrackRef, descriptor: ClipDescriptor) -> Self {
        Self::from_kind(CommandKind::AddClip {
            track,
            clip_id: Uuid::new_v4(),
            descriptor,
        })
    }

    pub fn remove_clip(clip_id: Uuid) -> Self {
        Self::from_kind(CommandKind::RemoveClip {
            clip_id,
            removed: None,
        })
    }

    /// Captures the clip as it is now. Build this before a drag starts
    /// previewing so that undo returns to the pre-drag state.
    pub fn move_clip(
        timeline: &Timeline,
        clip_id: Uuid,
        timestamp: f64,
        depth: Option<u32>,
    ) -> Result<Self> {
        let before = snapshot(timeline, clip_id)?;
        Ok(Self::from_kind(CommandKind::MoveClip {
            clip_id,
            timestamp,
            depth,
            before,
            after: None,
            auto_trim: None,
        }))
    }

    /// Captures the clip as it is now, like [`Command::move_clip`].
    pub fn trim_clip(timeline: &Timeline, clip_id: Uuid, request: TrimRequest) -> Result<Self> {
        let before = snapshot(timeline, clip_id)?;
        Ok(Self::from_kind(CommandKind::TrimClip {
            clip_id,
            request,
            before,
            after: None,
        }))
    }

    pub fn toggle_layer_mute(layer_id: Uuid) -> Self {
        Self::from_kind(CommandKind::ToggleLayerMute { layer_id })
    }

    pub fn toggle_clip_mute(clip_id: Uuid) -> Self {
        Self::from_kind(CommandKind::ToggleClipMute { clip_id })
    }

    /// Delete a multi-selection, possibly spanning several tracks.
    pub fn remove_clips(clip_ids: Vec<Uuid>) -> Self {
        Self::from_kind(CommandKind::RemoveClips {
            clip_ids,
            removed: vec![],
        })
    }

    /// Paste copies of `clipboard` so that the earliest one starts at `at`.
    /// Relative offsets and depths are kept; each copy then goes through
    /// the usual position search.
    pub fn paste_clips(track: TrackRef, clipboard: &[Clip], at: f64) -> Self {
        let origin = clipboard
            .iter()
            .map(|c| c.timestamp)
            .fold(f64::INFINITY, f64::min);
        let entries = clipboard
            .iter()
            .map(|c| {
                let descriptor = ClipDescriptor {
                    source_id: c.source_id,
                    timestamp: at + (c.timestamp - origin),
                    duration: c.duration,
                    trim_start: c.trim_start,
                    trim_end: c.trim_end,
                    depth: Some(c.depth),
                };
                (Uuid::new_v4(), descriptor)
            })
            .collect();
        Self::from_kind(CommandKind::PasteClips { track, entries })
    }

    /// Wrap an externally computed edit as a before/after pair of whole
    /// timelines.
    pub fn batch(description: impl Into<String>, before: Timeline, after: Timeline) -> Self {
        Self::from_kind(CommandKind::Batch {
            description: description.into(),
            before,
            after,
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn kind(&self) -> &CommandKind {
        &self.kind
    }

    pub fn kind_name(&self) -> &'static str {
        match self.kind {
            CommandKind::AddClip { .. } => "add_clip",
            CommandKind::RemoveClip { .. } => "remove_clip",
            CommandKind::MoveClip { .. } => "move_clip",
            CommandKind::TrimClip { .. } => "trim_clip",
            CommandKind::ToggleLayerMute { .. } => "toggle_layer_mute",
            CommandKind::ToggleClipMute { .. } => "toggle_clip_mute",
            CommandKind::RemoveClips { .. } => "remove_clips",
            CommandKind::PasteClips { .. } => "paste_clips",
            CommandKind::Batch { .. } => "batch",
        }
    }

    pub fn description(&self) -> &str {
        match &self.kind {
            CommandKind::AddClip { .. } => "Add clip",
            CommandKind::RemoveClip { .. } => "Remove clip",
            CommandKind::MoveClip { .. } => "Move clip",
            CommandKind::TrimClip { .. } => "Trim clip",
            CommandKind::ToggleLayerMute { .. } => "Toggle layer mute",
            CommandKind::ToggleClipMute { .. } => "Toggle clip mute",
            CommandKind::RemoveClips { .. } => "Delete clips",
            CommandKind::PasteClips { .. } => "Paste clips",
            CommandKind::Batch { description, .. } => description.as_str(),
        }
    }

    pub fn execute(&mut self, timeline: &mut Timeline) -> Result<()> {
        match &mut self.kind {
            CommandKind::AddClip {
                track,
                clip_id,
                descriptor,
            } => timeline
                .add_clip_with_id(*track, *clip_id, descriptor)
                .map(|_| ()),
            CommandKind::RemoveClip { clip_id, removed } => {
                *removed = Some(timeline.take_clip(*clip_id)?);
                Ok(())
            }
            CommandKind::MoveClip {
                after: Some(after),
                auto_trim,
                ..
            } => all_or_nothing(timeline, |tl| {
                if let Some(trim) = auto_trim {
                    let mut neighbour = snapshot(tl, trim.clip_id)?;
                    neighbour.trim_end = trim.new_trim_end;
                    tl.restore_clip(&neighbour)?;
                }
                tl.restore_clip(after)
            }),
            CommandKind::MoveClip {
                clip_id,
                timestamp,
                depth,
                after,
                auto_trim,
                ..
            } => {
                let outcome = timeline.move_clip(*clip_id, *timestamp, *depth)?;
                *auto_trim = outcome.auto_trim;
                *after = Some(outcome.clip);
                Ok(())
            }
            CommandKind::TrimClip {
                after: Some(after),
                ..
            } => timeline.restore_clip(after),
            CommandKind::TrimClip {
                clip_id,
                request,
                after,
                ..
            } => {
                *after = Some(timeline.trim_clip(*clip_id, *request)?);
                Ok(())
            }
            CommandKind::ToggleLayerMute { layer_id } => {
                timeline.toggle_layer_mute(*layer_id).map(|_| ())
            }
            CommandKind::ToggleClipMute { clip_id } => {
                timeline.toggle_clip_mute(*clip_id).map(|_| ())
            }
            CommandKind::RemoveClips { clip_ids, removed } => {
                *removed = timeline.remove_clips(clip_ids)?;
                Ok(())
            }
            CommandKind::PasteClips { track, entries } => {
                timeline.add_clips(*track, entries).map(|_| ())
            }
            CommandKind::Batch { after, .. } => {
                *timeline = after.clone();
                Ok(())
            }
        }
    }

    pub fn undo(&mut self, timeline: &mut Timeline) -> Result<()> {
        match &mut self.kind {
            CommandKind::AddClip { clip_id, .. } => timeline.remove_clip(*clip_id).map(|_| ()),
            CommandKind::RemoveClip { removed, .. } => {
                let removed = removed
                    .clone()
                    .ok_or_else(|| CoreError::InvalidOperation("no removed clip saved".into()))?;
                timeline.insert_clip(removed.track, removed.index, removed.clip)
            }
            CommandKind::MoveClip {
                before, auto_trim, ..
            } => all_or_nothing(timeline, |tl| {
                if let Some(trim) = auto_trim {
                    let mut neighbour = snapshot(tl, trim.clip_id)?;
                    neighbour.trim_end = trim.previous_trim_end;
                    tl.restore_clip(&neighbour)?;
                }
                tl.restore_clip(before)
            }),
            CommandKind::TrimClip { before, .. } => timeline.restore_clip(before),
            CommandKind::ToggleLayerMute { layer_id } => {
                timeline.toggle_layer_mute(*layer_id).map(|_| ())
            }
            CommandKind::ToggleClipMute { clip_id } => {
                timeline.toggle_clip_mute(*clip_id).map(|_| ())
            }
            CommandKind::RemoveClips { removed, .. } => all_or_nothing(timeline, |tl| {
                for record in removed.iter().rev() {
                    tl.insert_clip(record.track, record.index, record.clip.clone())?;
                }
                Ok(())
            }),
            CommandKind::PasteClips { entries, .. } => {
                let ids: Vec<Uuid> = entries.iter().map(|(id, _)| *id).collect();
                timeline.remove_clips(&ids).map(|_| ())
            }
            CommandKind::Batch { before, .. } => {
                *timeline = before.clone();
                Ok(())
            }
        }
    }
}

fn snapshot(timeline: &Timeline, clip_id: Uuid) -> Result<Clip> {
    timeline
        .find_clip(clip_id)
        .map(|(_, clip)| clip.clone())
        .ok_or(CoreError::ClipNotFound(clip_id))
}

/// Run a multi-step mutation on a scratch copy and swap it in only if every
/// step succeeds.
fn all_or_nothing(
    timeline: &mut Timeline,
    f: impl FnOnce(&mut Timeline) -> Result<()>,
) -> Result<()> {
    let mut scratch = timeline.clone();
    f(&mut scratch)?;
    *timeline = scratch;
    Ok(())
}
