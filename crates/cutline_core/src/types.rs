use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Placement
// ---------------------------------------------------------------------------

/// The positional part of a clip: where it sits and how much of it is visible.
///
/// Placement searches work on this rather than on [`Clip`] so that a candidate
/// can be evaluated before a clip exists.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub timestamp: f64,
    pub duration: f64,
    pub trim_start: f64,
    pub trim_end: f64,
    pub depth: u32,
}

impl Placement {
    pub fn new(timestamp: f64, duration: f64) -> Self {
        Self {
            timestamp,
            duration,
            trim_start: 0.0,
            trim_end: 0.0,
            depth: 0,
        }
    }

    pub fn at_depth(mut self, depth: u32) -> Self {
        self.depth = depth;
        self
    }

    pub fn visible_duration(&self) -> f64 {
        self.duration - self.trim_start - self.trim_end
    }

    pub fn visible_end(&self) -> f64 {
        self.timestamp + self.visible_duration()
    }
}

// ---------------------------------------------------------------------------
// Clip
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Clip {
    pub id: Uuid,
    pub source_id: Uuid,
    pub timestamp: f64,
    pub duration: f64,
    #[serde(default)]
    pub trim_start: f64,
    #[serde(default)]
    pub trim_end: f64,
    #[serde(default)]
    pub depth: u32,
    #[serde(default)]
    pub muted: bool,
}

impl Clip {
    pub fn visible_duration(&self) -> f64 {
        self.duration - self.trim_start - self.trim_end
    }

    pub fn visible_end(&self) -> f64 {
        self.timestamp + self.visible_duration()
    }

    pub fn placement(&self) -> Placement {
        Placement {
            timestamp: self.timestamp,
            duration: self.duration,
            trim_start: self.trim_start,
            trim_end: self.trim_end,
            depth: self.depth,
        }
    }
}

// ---------------------------------------------------------------------------
// ClipDescriptor
// ---------------------------------------------------------------------------

/// A request to create a clip, typically resolved from the media catalog.
///
/// When `depth` is `None` the clip keeps its requested timestamp and is stacked
/// on the lowest free depth; when it is set, the timestamp is moved to the
/// nearest free slot in that depth instead.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ClipDescriptor {
    pub source_id: Uuid,
    pub timestamp: f64,
    pub duration: f64,
    #[serde(default)]
    pub trim_start: f64,
    #[serde(default)]
    pub trim_end: f64,
    #[serde(default)]
    pub depth: Option<u32>,
}

impl ClipDescriptor {
    pub fn new(source_id: Uuid, timestamp: f64, duration: f64) -> Self {
        Self {
            source_id,
            timestamp,
            duration,
            trim_start: 0.0,
            trim_end: 0.0,
            depth: None,
        }
    }

    pub fn placement(&self) -> Placement {
        Placement {
            timestamp: self.timestamp,
            duration: self.duration,
            trim_start: self.trim_start,
            trim_end: self.trim_end,
            depth: self.depth.unwrap_or(0),
        }
    }
}

// ---------------------------------------------------------------------------
// TrimRequest
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TrimRequest {
    pub trim_start: Option<f64>,
    pub trim_end: Option<f64>,
    pub timestamp: Option<f64>,
}

// ---------------------------------------------------------------------------
// Layer
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Layer {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub muted: bool,
    pub clips: Vec<Clip>,
}

impl Layer {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            muted: false,
            clips: vec![],
        }
    }
}

// ---------------------------------------------------------------------------
// TrackRef
// ---------------------------------------------------------------------------

/// Addresses one clip collection: the video track or a single audio layer.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum TrackRef {
    Video,
    Audio(Uuid),
}

impl fmt::Display for TrackRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrackRef::Video => write!(f, "video"),
            TrackRef::Audio(layer_id) => write!(f, "audio layer {}", layer_id),
        }
    }
}

// ---------------------------------------------------------------------------
// Timeline
// ---------------------------------------------------------------------------

/// Canonical clip state: the flat video track plus the ordered audio layers.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Timeline {
    pub video: Vec<Clip>,
    pub audio: Vec<Layer>,
}

impl Timeline {
    pub fn new() -> Self {
        Self::default()
    }
}
