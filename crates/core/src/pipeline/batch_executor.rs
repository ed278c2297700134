use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use serde::Serialize;

use crate::aggregation::face_result::FrameResult;
use crate::ingestion::domain::image_decoder::DecodeError;
use crate::ingestion::domain::image_source::ImageSource;
use crate::pipeline::analyze_emotions_use_case::AnalyzeEmotionsUseCase;
use crate::shared::constants::NO_FACE_MESSAGE;

/// Faces found in one image of a batch.
///
/// An image without faces carries the advisory `message`; an image that
/// could not be decoded carries `error` instead.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ImageAnalysis {
    pub image: PathBuf,
    pub faces: FrameResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ImageAnalysis {
    pub fn new(image: &Path, faces: FrameResult) -> Self {
        let message = faces.is_empty().then(|| NO_FACE_MESSAGE.to_string());
        Self {
            image: image.to_path_buf(),
            faces,
            message,
            error: None,
        }
    }

    pub fn failed(image: &Path, error: &DecodeError) -> Self {
        Self {
            image: image.to_path_buf(),
            faces: Vec::new(),
            message: None,
            error: Some(error.to_string()),
        }
    }
}

/// Runs one batch image through the pipeline, keeping the decode error.
pub fn analyze_image(use_case: &AnalyzeEmotionsUseCase, image: &Path) -> ImageAnalysis {
    match use_case.analyze(&ImageSource::Path(image.to_path_buf())) {
        Ok(faces) => ImageAnalysis::new(image, faces),
        Err(e) => {
            log::warn!("Could not decode {}: {e}", image.display());
            ImageAnalysis::failed(image, &e)
        }
    }
}

/// Configuration for a batch run.
#[derive(Default)]
pub struct BatchConfig {
    /// Called with `(done, total)` after each image. Returning `false` cancels.
    pub on_progress: Option<Box<dyn Fn(usize, usize) -> bool + Send>>,
    pub cancelled: Arc<AtomicBool>,
}

/// Abstracts how a list of images is fed through one shared pipeline.
///
/// Results come back in input order. Images skipped because of
/// cancellation are absent from the output.
pub trait BatchExecutor: Send {
    fn execute(
        &self,
        use_case: &AnalyzeEmotionsUseCase,
        images: &[PathBuf],
        config: &BatchConfig,
    ) -> Vec<ImageAnalysis>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregation::face_result::aggregate;
    use crate::classification::domain::emotion::EmotionScores;
    use crate::shared::region::FaceRegion;
    use serde_json::json;

    #[test]
    fn test_zero_faces_carries_advisory() {
        let analysis = ImageAnalysis::new(Path::new("empty.jpg"), vec![]);

        assert_eq!(
            serde_json::to_value(&analysis).unwrap(),
            json!({"image": "empty.jpg", "faces": [], "message": NO_FACE_MESSAGE})
        );
    }

    #[test]
    fn test_faces_found_has_no_message() {
        let face = aggregate(
            FaceRegion {
                x: 0,
                y: 0,
                width: 4,
                height: 4,
            },
            EmotionScores::fallback(),
        );
        let value = serde_json::to_value(ImageAnalysis::new(Path::new("a.jpg"), vec![face])).unwrap();

        assert!(value.get("message").is_none());
        assert!(value.get("error").is_none());
        assert_eq!(value["faces"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_decode_failure_carries_error_not_advisory() {
        let err = DecodeError::MalformedInput("empty image data".to_string());
        let value = serde_json::to_value(ImageAnalysis::failed(Path::new("bad.jpg"), &err)).unwrap();

        assert_eq!(
            value,
            json!({"image": "bad.jpg", "faces": [], "error": "malformed input: empty image data"})
        );
    }
}
