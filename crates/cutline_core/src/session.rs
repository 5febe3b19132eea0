//! Session payload exchanged with the persistence layer.
//!
//! Older sessions stored audio as one flat clip array. That shape is accepted
//! on load and migrated to a single layer; saving always writes layers.

use crate::error::Result;
use crate::types::*;
use crate::validate::ensure_valid;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use uuid::Uuid;

pub const SESSION_EXTENSION: &str = "cutline";

/// Name given to the layer created from a legacy flat audio array.
pub const LEGACY_LAYER_NAME: &str = "Audio 1";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionPayload {
    #[serde(default)]
    pub video_clips: Vec<Clip>,
    #[serde(default, rename = "audioLayers", alias = "audioClips")]
    pub audio: AudioPayload,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum AudioPayload {
    Layered(Vec<Layer>),
    Legacy(Vec<Clip>),
}

impl Default for AudioPayload {
    fn default() -> Self {
        AudioPayload::Layered(vec![])
    }
}

impl SessionPayload {
    pub fn from_timeline(timeline: &Timeline) -> Self {
        Self {
            video_clips: timeline.video.clone(),
            audio: AudioPayload::Layered(timeline.audio.clone()),
        }
    }

    /// Resolve the audio shape and build the timeline. Does not validate.
    pub fn into_timeline(self) -> Timeline {
        let mut taken: HashSet<Uuid> = self.video_clips.iter().map(|c| c.id).collect();
        let audio = migrate_audio(self.audio, &mut taken);
        Timeline {
            video: self.video_clips,
            audio,
        }
    }
}

/// Turn either audio shape into layers. Legacy clips whose id is already in
/// `taken` get a fresh id.
pub fn migrate_audio(audio: AudioPayload, taken: &mut HashSet<Uuid>) -> Vec<Layer> {
    match audio {
        AudioPayload::Layered(layers) => layers,
        AudioPayload::Legacy(clips) => {
            let mut layer = Layer::new(LEGACY_LAYER_NAME);
            for mut clip in clips {
                if !taken.insert(clip.id) {
                    let fresh = Uuid::new_v4();
                    tracing::warn!(old = %clip.id, new = %fresh, "regenerated colliding legacy audio clip id");
                    clip.id = fresh;
                    taken.insert(fresh);
                }
                layer.clips.push(clip);
            }
            tracing::info!(clips = layer.clips.len(), "migrated legacy audio clips into a layer");
            vec![layer]
        }
    }
}

impl Timeline {
    /// Decode, migrate and validate a session payload. Legacy audio ids are
    /// regenerated on collision; duplicates in layered payloads are rejected.
    pub fn from_session_json(json: &str) -> Result<Self> {
        let payload: SessionPayload = serde_json::from_str(json)?;
        let timeline = payload.into_timeline();
        ensure_valid(&timeline)?;
        Ok(timeline)
    }

    /// Validate and encode as a pretty-printed session payload.
    pub fn to_session_json(&self) -> Result<String> {
        ensure_valid(self)?;
        Ok(serde_json::to_string_pretty(&SessionPayload::from_timeline(self))?)
    }

    /// Save to a file. Appends the `.cutline` extension if not present and
    /// returns the path written. Nothing is written if validation fails.
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<PathBuf> {
        let path = ensure_extension(path.as_ref());
        let json = self.to_session_json()?;
        std::fs::write(&path, json)?;
        tracing::info!(path = %path.display(), "session saved");
        Ok(path)
    }

    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let data = std::fs::read_to_string(path.as_ref())?;
        let timeline = Self::from_session_json(&data)?;
        tracing::info!(path = %path.as_ref().display(), clips = timeline.video.len(), layers = timeline.audio.len(), "session loaded");
        Ok(timeline)
    }
}

fn ensure_extension(path: &Path) -> PathBuf {
    if path.extension().and_then(|e| e.to_str()) == Some(SESSION_EXTENSION) {
        path.to_path_buf()
    } else {
        let mut p = path.to_path_buf();
        let mut name = p.file_name().unwrap_or_default().to_os_string();
        name.push(".");
        name.push(SESSION_EXTENSION);
        p.set_file_name(name);
        p
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;
    use serde_json::json;
    use tempfile::TempDir;

    fn clip_at(timestamp: f64, duration: f64) -> Clip {
        Clip {
            id: Uuid::new_v4(),
            source_id: Uuid::new_v4(),
            timestamp,
            duration,
            trim_start: 0.0,
            trim_end: 0.0,
            depth: 0,
            muted: false,
        }
    }

    fn populated() -> Timeline {
        let mut music = Layer::new("Music");
        music.clips.push(clip_at(0.0, 8.0));
        Timeline {
            video: vec![clip_at(0.0, 5.0), clip_at(5.0, 2.5)],
            audio: vec![music],
        }
    }

    #[test]
    fn save_load_roundtrip() {
        let dir = TempDir::new().unwrap();
        let timeline = populated();

        let path = timeline.save_to_file(dir.path().join("edit.cutline")).unwrap();
        let loaded = Timeline::load_from_file(&path).unwrap();
        assert_eq!(timeline, loaded);
    }

    #[test]
    fn extension_appended_if_missing() {
        let dir = TempDir::new().unwrap();
        let path = populated().save_to_file(dir.path().join("no_ext")).unwrap();
        assert_eq!(path, dir.path().join("no_ext.cutline"));
        assert!(path.exists());
    }

    #[test]
    fn load_nonexistent_file_returns_error() {
        let dir = TempDir::new().unwrap();
        let result = Timeline::load_from_file(dir.path().join("missing.cutline"));
        assert!(matches!(result.unwrap_err(), CoreError::Io(_)));
    }

    #[test]
    fn overlapping_session_not_saved() {
        let dir = TempDir::new().unwrap();
        let mut timeline = populated();
        timeline.video[1].timestamp = 4.0;

        let result = timeline.save_to_file(dir.path().join("bad"));
        match result {
            Err(CoreError::OverlappingClips(violations)) => {
                assert_eq!(violations.len(), 1);
                assert_eq!(violations[0].start, 4.0);
                assert_eq!(violations[0].end, 5.0);
            }
            other => panic!("expected OverlappingClips, got {:?}", other),
        }
        assert!(!dir.path().join("bad.cutline").exists());
    }

    #[test]
    fn overlapping_payload_rejected_on_load() {
        let mut timeline = populated();
        timeline.video[1].timestamp = 1.0;
        let json = serde_json::to_string(&SessionPayload::from_timeline(&timeline)).unwrap();
        assert!(matches!(
            Timeline::from_session_json(&json).unwrap_err(),
            CoreError::OverlappingClips(_)
        ));
    }

    #[test]
    fn legacy_flat_audio_is_migrated() {
        let video = clip_at(0.0, 5.0);
        let shared_id = video.id;
        let payload = json!({
            "videoClips": [video],
            "audioClips": [
                { "id": shared_id, "sourceId": Uuid::new_v4(), "timestamp": 0.0, "duration": 3.0 },
                { "id": Uuid::new_v4(), "sourceId": Uuid::new_v4(), "timestamp": 3.0, "duration": 2.0 }
            ]
        });

        let timeline = Timeline::from_session_json(&payload.to_string()).unwrap();
        assert_eq!(timeline.audio.len(), 1);
        let layer = &timeline.audio[0];
        assert_eq!(layer.name, LEGACY_LAYER_NAME);
        assert_eq!(layer.clips.len(), 2);
        assert_ne!(layer.clips[0].id, shared_id);
        assert_eq!(layer.clips[1].timestamp, 3.0);
    }

    #[test]
    fn legacy_duplicate_ids_within_audio_regenerated() {
        let id = Uuid::new_v4();
        let mut taken = HashSet::new();
        let mut a = clip_at(0.0, 1.0);
        let mut b = clip_at(2.0, 1.0);
        a.id = id;
        b.id = id;

        let layers = migrate_audio(AudioPayload::Legacy(vec![a, b]), &mut taken);
        assert_eq!(layers[0].clips[0].id, id);
        assert_ne!(layers[0].clips[1].id, id);
    }

    #[test]
    fn layered_audio_passes_through() {
        let timeline = populated();
        let json = timeline.to_session_json().unwrap();
        let payload: SessionPayload = serde_json::from_str(&json).unwrap();
        assert!(matches!(payload.audio, AudioPayload::Layered(ref layers) if layers.len() == 1));
    }

    #[test]
    fn saved_payload_uses_stable_keys() {
        let json = populated().to_session_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        let object = value.as_object().unwrap();
        assert!(object.contains_key("videoClips"));
        assert_eq!(object["audioLayers"].as_array().unwrap().len(), 1);
        assert!(!object.contains_key("audio"));
    }

    #[test]
    fn clip_with_no_visible_duration_rejected_on_load() {
        let payload = json!({
            "videoClips": [{
                "id": Uuid::new_v4(),
                "sourceId": Uuid::new_v4(),
                "timestamp": 0.0,
                "duration": 2.0,
                "trimStart": 1.5,
                "trimEnd": 1.0
            }]
        });
        assert!(matches!(
            Timeline::from_session_json(&payload.to_string()).unwrap_err(),
            CoreError::InvalidClip(_)
        ));
    }

    #[test]
    fn duplicate_layered_ids_rejected_on_load() {
        let first = clip_at(0.0, 5.0);
        let mut second = clip_at(5.0, 5.0);
        second.id = first.id;
        let payload = json!({ "videoClips": [first, second], "audioLayers": [] });

        assert!(matches!(
            Timeline::from_session_json(&payload.to_string()).unwrap_err(),
            CoreError::InvalidClip(_)
        ));
    }

    #[test]
    fn empty_payload_is_empty_timeline() {
        let timeline = Timeline::from_session_json("{}").unwrap();
        assert_eq!(timeline, Timeline::default());
    }
}
