use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use crate::aggregation::face_result::{aggregate, FrameResult};
use crate::classification::domain::emotion::EmotionScores;
use crate::classification::domain::emotion_classifier::EmotionClassifier;
use crate::classification::domain::fallback_classifier::FallbackClassifier;
use crate::detection::domain::bounded_locator::BoundedLocator;
use crate::detection::domain::face_locator::FaceLocator;
use crate::ingestion::domain::image_decoder::{DecodeError, ImageDecoder};
use crate::ingestion::domain::image_source::ImageSource;
use crate::pipeline::frame_report::FrameReport;
use crate::pipeline::pipeline_logger::{
    NullPipelineLogger, PipelineLogger, METRIC_FACES, STAGE_CLASSIFY, STAGE_DECODE, STAGE_LOCATE,
};
use crate::shared::pixel_buffer::PixelBuffer;

/// Frame-to-result pipeline: decode → locate → classify each face → aggregate.
///
/// Holds no per-run state, so one instance can serve any number of
/// concurrent requests. Every stage degrades instead of failing: a detector
/// fault means no faces, a classifier fault means neutral fallback scores,
/// and an undecodable input means an empty result.
pub struct AnalyzeEmotionsUseCase {
    decoder: Box<dyn ImageDecoder>,
    locator: BoundedLocator,
    classifier: FallbackClassifier,
    logger: Box<dyn PipelineLogger>,
}

impl AnalyzeEmotionsUseCase {
    pub fn new(
        decoder: Box<dyn ImageDecoder>,
        locator: Arc<dyn FaceLocator>,
        classifier: Arc<dyn EmotionClassifier>,
    ) -> Self {
        Self {
            decoder,
            locator: BoundedLocator::new(locator),
            classifier: FallbackClassifier::new(classifier),
            logger: Box::new(NullPipelineLogger),
        }
    }

    pub fn with_logger(mut self, logger: Box<dyn PipelineLogger>) -> Self {
        self.logger = logger;
        self
    }

    pub fn logger(&self) -> &dyn PipelineLogger {
        self.logger.as_ref()
    }

    /// Batch-image entry point. An unreadable image yields no faces.
    pub fn run_on_image(&self, path: &Path) -> FrameResult {
        self.run_or_empty(&ImageSource::Path(path.to_path_buf()))
    }

    /// Same as [`run_on_image`](Self::run_on_image) for an in-memory upload.
    pub fn run_on_bytes(&self, bytes: Vec<u8>) -> FrameResult {
        self.run_or_empty(&ImageSource::Bytes(bytes))
    }

    /// Single live-frame entry point for a `data:image/...;base64,...` string.
    pub fn run_on_frame(&self, data_url: &str) -> FrameReport {
        if data_url.trim().is_empty() {
            return FrameReport::missing_payload();
        }

        match self.analyze(&ImageSource::DataUrl(data_url.to_string())) {
            Ok(faces) => FrameReport::from_faces(faces),
            Err(e) => {
                log::warn!("Could not decode live frame: {e}");
                FrameReport::ingestion_failed(&e)
            }
        }
    }

    /// Decodes `source` and analyses it. The decode error is returned as a
    /// value so callers can report it.
    pub fn analyze(&self, source: &ImageSource) -> Result<FrameResult, DecodeError> {
        let start = Instant::now();
        let decoded = self.decoder.decode(source);
        self.logger.timing(STAGE_DECODE, elapsed_ms(start));

        Ok(self.analyze_buffer(&decoded?))
    }

    /// Locates faces in an already decoded buffer and classifies each one.
    pub fn analyze_buffer(&self, buffer: &PixelBuffer) -> FrameResult {
        let start = Instant::now();
        let regions = self.locator.locate(buffer);
        self.logger.timing(STAGE_LOCATE, elapsed_ms(start));

        let start = Instant::now();
        let faces: FrameResult = regions
            .into_iter()
            .map(|region| {
                let scores = match buffer.crop(&region) {
                    Some(face) => self.classifier.classify(&face),
                    None => {
                        log::warn!("Region {region:?} could not be cropped, using neutral fallback");
                        EmotionScores::fallback()
                    }
                };
                aggregate(region, scores)
            })
            .collect();
        self.logger.timing(STAGE_CLASSIFY, elapsed_ms(start));
        self.logger.metric(METRIC_FACES, faces.len() as f64);

        log::debug!(
            "Analysed {}x{} buffer: {} face(s)",
            buffer.width(),
            buffer.height(),
            faces.len()
        );
        faces
    }

    fn run_or_empty(&self, source: &ImageSource) -> FrameResult {
        self.analyze(source).unwrap_or_else(|e| {
            log::warn!("Could not decode {}: {e}", source.describe());
            Vec::new()
        })
    }
}

fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}
