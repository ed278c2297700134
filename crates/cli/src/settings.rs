use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use moodlens_core::detection::infrastructure::onnx_blazeface_locator::DEFAULT_CONFIDENCE;

/// Persistent defaults. Command-line flags override every field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub confidence: f64,
    pub detector_model: Option<PathBuf>,
    pub classifier_model: Option<PathBuf>,
    pub store_path: Option<PathBuf>,
    pub jobs: usize,
    pub intra_threads: usize,
    pub history_limit: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            confidence: DEFAULT_CONFIDENCE,
            detector_model: None,
            classifier_model: None,
            store_path: None,
            jobs: 1,
            intra_threads: 2,
            history_limit: 5,
        }
    }
}

impl Settings {
    fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("MoodLens").join("settings.json"))
    }

    pub fn load() -> Self {
        Self::config_path()
            .map(|path| Self::load_from(&path))
            .unwrap_or_default()
    }

    /// Reads settings from `path`, falling back to defaults when the file is
    /// missing or unparsable.
    pub fn load_from(path: &Path) -> Self {
        let Ok(json) = fs::read_to_string(path) else {
            return Self::default();
        };
        serde_json::from_str(&json).unwrap_or_else(|e| {
            log::warn!("Ignoring unreadable settings at {}: {e}", path.display());
            Self::default()
        })
    }
}
