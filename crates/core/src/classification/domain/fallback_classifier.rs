use std::sync::Arc;

use super::emotion::EmotionScores;
use super::emotion_classifier::{ClassifierFault, EmotionClassifier};
use crate::shared::pixel_buffer::PixelBuffer;

/// Wraps an [`EmotionClassifier`] so classification never fails.
///
/// Any fault, including an empty crop that never reaches the inner
/// classifier, yields [`EmotionScores::fallback`].
pub struct FallbackClassifier {
    inner: Arc<dyn EmotionClassifier>,
}

impl FallbackClassifier {
    pub fn new(inner: Arc<dyn EmotionClassifier>) -> Self {
        Self { inner }
    }

    pub fn classify(&self, face: &PixelBuffer) -> EmotionScores {
        let result = if face.is_empty() {
            Err(ClassifierFault::EmptyCrop)
        } else {
            self.inner.classify(face)
        };

        result.unwrap_or_else(|e| {
            log::warn!(
                "Emotion classification failed for {}x{} crop, using neutral fallback: {e}",
                face.width(),
                face.height()
            );
            EmotionScores::fallback()
        })
    }
}
