use thiserror::Error;

use super::emotion::EmotionScores;
use crate::shared::pixel_buffer::PixelBuffer;

/// Classification of a single face crop failed.
///
/// Recovered by substituting [`EmotionScores::fallback`].
#[derive(Error, Debug)]
pub enum ClassifierFault {
    #[error("face crop is empty")]
    EmptyCrop,
    #[error("unsupported face crop format: {0}")]
    UnsupportedFormat(String),
    #[error("emotion classifier failed: {0}")]
    Backend(String),
}

/// Domain interface for per-face emotion scoring.
///
/// Called once per located face, possibly from several threads at once.
pub trait EmotionClassifier: Send + Sync {
    fn classify(&self, face: &PixelBuffer) -> Result<EmotionScores, ClassifierFault>;
}
