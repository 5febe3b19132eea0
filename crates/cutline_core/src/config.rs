//! Editor configuration.
//!
//! Stored as JSON; every field falls back to its default when absent.

use crate::error::{CoreError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EditorConfig {
    /// Maximum number of undo entries kept. Older entries are evicted.
    pub history_capacity: usize,

    /// Distance in seconds within which a dragged clip snaps to an edge.
    pub snap_threshold: f64,

    /// Quiet period before a scheduled session write hits disk.
    pub save_debounce_ms: u64,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            history_capacity: 100,
            snap_threshold: 0.1,
            save_debounce_ms: 500,
        }
    }
}

impl EditorConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        let config: EditorConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a JSON file. A missing file yields the defaults.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::info!(path = %path.display(), "no editor config found, using defaults");
            return Ok(Self::default());
        }
        let data = std::fs::read_to_string(path)?;
        Self::from_json(&data)
    }

    pub fn validate(&self) -> Result<()> {
        if self.history_capacity == 0 {
            return Err(CoreError::InvalidConfig(
                "history_capacity must be at least 1".into(),
            ));
        }
        if !self.snap_threshold.is_finite() || self.snap_threshold < 0.0 {
            return Err(CoreError::InvalidConfig(
                "snap_threshold must be a non-negative number".into(),
            ));
        }
        Ok(())
    }
}
