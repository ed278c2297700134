use std::path::PathBuf;
use std::sync::atomic::Ordering;

use crate::pipeline::analyze_emotions_use_case::AnalyzeEmotionsUseCase;
use crate::pipeline::batch_executor::{analyze_image, BatchConfig, BatchExecutor, ImageAnalysis};

/// Runs every image on the calling thread.
#[derive(Default)]
pub struct SequentialBatchExecutor;

impl BatchExecutor for SequentialBatchExecutor {
    fn execute(
        &self,
        use_case: &AnalyzeEmotionsUseCase,
        images: &[PathBuf],
        config: &BatchConfig,
    ) -> Vec<ImageAnalysis> {
        let total = images.len();
        let mut results = Vec::with_capacity(total);

        for (i, path) in images.iter().enumerate() {
            if config.cancelled.load(Ordering::Relaxed) {
                break;
            }
            results.push(analyze_image(use_case, path));

            if let Some(ref cb) = config.on_progress {
                if !cb(i + 1, total) {
                    config.cancelled.store(true, Ordering::Relaxed);
                }
            }
        }

        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classification::domain::emotion::EmotionScores;
    use crate::classification::domain::emotion_classifier::{ClassifierFault, EmotionClassifier};
    use crate::detection::domain::face_locator::{DetectorFault, FaceLocator};
    use crate::ingestion::infrastructure::image_crate_decoder::ImageCrateDecoder;
    use crate::shared::constants::NO_FACE_MESSAGE;
    use crate::shared::pixel_buffer::PixelBuffer;
    use crate::shared::region::DetectedBox;
    use std::path::Path;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;

    struct WholeFrameLocator;

    impl FaceLocator for WholeFrameLocator {
        fn locate(&self, buffer: &PixelBuffer) -> Result<Vec<DetectedBox>, DetectorFault> {
            Ok(vec![DetectedBox::new(
                0,
                0,
                buffer.width() as i32,
                buffer.height() as i32,
            )])
        }
    }

    struct BlankLocator;

    impl FaceLocator for BlankLocator {
        fn locate(&self, _buffer: &PixelBuffer) -> Result<Vec<DetectedBox>, DetectorFault> {
            Ok(vec![])
        }
    }

    struct NeutralClassifier;

    impl EmotionClassifier for NeutralClassifier {
        fn classify(&self, _face: &PixelBuffer) -> Result<EmotionScores, ClassifierFault> {
            Ok(EmotionScores::fallback())
        }
    }

    fn use_case() -> AnalyzeEmotionsUseCase {
        AnalyzeEmotionsUseCase::new(
            Box::new(ImageCrateDecoder::new()),
            Arc::new(WholeFrameLocator),
            Arc::new(NeutralClassifier),
        )
    }

    fn write_image(dir: &Path, name: &str, width: u32) -> PathBuf {
        let path = dir.join(name);
        image::RgbImage::new(width, 8).save(&path).unwrap();
        path
    }

    #[test]
    fn test_results_follow_input_order() {
        let dir = tempfile::tempdir().unwrap();
        let images = vec![
            write_image(dir.path(), "a.png", 11),
            dir.path().join("missing.png"),
            write_image(dir.path(), "b.png", 7),
        ];

        let results = SequentialBatchExecutor.execute(&use_case(), &images, &BatchConfig::default());

        assert_eq!(results.len(), 3);
        assert_eq!(results[0].image, images[0]);
        assert_eq!(results[0].faces[0].region().width, 11);
        assert!(results[1].faces.is_empty());
        assert_eq!(results[2].faces[0].region().width, 7);
        assert!(results[0].message.is_none() && results[2].message.is_none());
    }

    #[test]
    fn test_missing_image_reports_error_instead_of_advisory() {
        let dir = tempfile::tempdir().unwrap();
        let images = vec![dir.path().join("missing.png")];

        let results = SequentialBatchExecutor.execute(&use_case(), &images, &BatchConfig::default());

        assert_eq!(results[0].message, None);
        let error = results[0].error.as_deref().unwrap();
        assert!(error.contains("missing.png"), "{error}");
    }

    #[test]
    fn test_image_without_faces_carries_advisory() {
        let dir = tempfile::tempdir().unwrap();
        let images = vec![write_image(dir.path(), "blank.png", 9)];
        let uc = AnalyzeEmotionsUseCase::new(
            Box::new(ImageCrateDecoder::new()),
            Arc::new(BlankLocator),
            Arc::new(NeutralClassifier),
        );

        let results = SequentialBatchExecutor.execute(&uc, &images, &BatchConfig::default());

        assert!(results[0].faces.is_empty());
        assert_eq!(results[0].message.as_deref(), Some(NO_FACE_MESSAGE));
        assert_eq!(results[0].error, None);
    }

    #[test]
    fn test_progress_false_cancels_remaining_images() {
        let dir = tempfile::tempdir().unwrap();
        let images: Vec<_> = (0..4)
            .map(|i| write_image(dir.path(), &format!("{i}.png"), 4))
            .collect();
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_cb = calls.clone();
        let config = BatchConfig {
            on_progress: Some(Box::new(move |done, total| {
                assert_eq!(total, 4);
                calls_cb.fetch_add(1, Ordering::SeqCst);
                done < 2
            })),
            ..Default::default()
        };

        let results = SequentialBatchExecutor.execute(&use_case(), &images, &config);

        assert_eq!(results.len(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(config.cancelled.load(Ordering::SeqCst));
    }

    #[test]
    fn test_empty_batch() {
        let results = SequentialBatchExecutor.execute(&use_case(), &[], &BatchConfig::default());
        assert!(results.is_empty());
    }
}
