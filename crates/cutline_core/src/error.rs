use crate::validate::Violation;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Clip not found: {0}")]
    ClipNotFound(Uuid),

    #[error("Layer not found: {0}")]
    LayerNotFound(Uuid),

    #[error("Invalid clip: {0}")]
    InvalidClip(String),

    #[error("Clip {clip_id} would overlap clip {with_id}")]
    OverlapDetected { clip_id: Uuid, with_id: Uuid },

    #[error("OVERLAPPING_CLIPS: {} violation(s)", .0.len())]
    OverlappingClips(Vec<Violation>),

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("History is busy")]
    HistoryBusy,

    #[error("Invalid config: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, CoreError>;
