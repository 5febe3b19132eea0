//! `cutline_core`: clip placement and undo/redo for a multi-track timeline.
//!
//! A [`Timeline`] holds the canonical clip state. Edits are wrapped in
//! [`Command`] values and run through a [`History`], which keeps them
//! reversible. Placement on a track (overlap tests, depth allocation,
//! nearest free position, overwrite auto-trim) lives in [`placement`].

pub mod commands;
pub mod config;
pub mod editing;
pub mod error;
pub mod history;
pub mod placement;
pub mod session;
pub mod snapping;
pub mod types;
pub mod validate;

pub use commands::{Command, CommandKind};
pub use config::EditorConfig;
pub use editing::{AppliedTrim, MoveOutcome, RemovedClip};
pub use error::{CoreError, Result};
pub use history::{History, HistoryState};
pub use placement::{
    find_available_depth, find_nearest_valid_position, ranges_overlap, resolve_auto_trim,
    AutoTrim, MIN_VISIBLE_DURATION, OVERLAP_EPSILON,
};
pub use session::{AudioPayload, SessionPayload};
pub use types::{Clip, ClipDescriptor, Layer, Placement, Timeline, TrackRef, TrimRequest};
pub use validate::{validate_timeline, validate_track, Violation};
