use serde::Serialize;

use crate::classification::domain::emotion::{Emotion, EmotionScores};
use crate::shared::region::FaceRegion;

/// Emotion analysis of one located face.
///
/// Only [`aggregate`] builds one, so `dominant` always is the arg-max of
/// `scores`. Serialized as
/// `{"coordinates": {...}, "emotions": {...}, "dominant_emotion": "..."}`.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FaceResult {
    #[serde(rename = "coordinates")]
    region: FaceRegion,
    #[serde(rename = "emotions")]
    scores: EmotionScores,
    #[serde(rename = "dominant_emotion")]
    dominant: Emotion,
}

/// Face results of one frame, in detection order.
pub type FrameResult = Vec<FaceResult>;

impl FaceResult {
    pub fn region(&self) -> FaceRegion {
        self.region
    }

    pub fn scores(&self) -> &EmotionScores {
        &self.scores
    }

    pub fn dominant(&self) -> Emotion {
        self.dominant
    }

    /// The dominant label's own score.
    pub fn confidence(&self) -> f64 {
        self.scores.get(self.dominant)
    }
}

/// Pairs a region with its scores and picks the dominant label.
pub fn aggregate(region: FaceRegion, scores: EmotionScores) -> FaceResult {
    let (dominant, _) = scores.dominant();
    FaceResult {
        region,
        scores,
        dominant,
    }
}
