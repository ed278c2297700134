use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::aggregation::face_result::FaceResult;
use crate::classification::domain::emotion::{Emotion, EmotionScores};
use crate::shared::region::FaceRegion;

/// Where the analysed frames came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetectionType {
    Upload,
    Webcam,
    Video,
}

impl DetectionType {
    pub fn as_str(self) -> &'static str {
        match self {
            DetectionType::Upload => "upload",
            DetectionType::Webcam => "webcam",
            DetectionType::Video => "video",
        }
    }
}

impl fmt::Display for DetectionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One analysis run: an upload batch entry or a live frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionSession {
    pub session_id: String,
    pub detection_type: DetectionType,
    pub created_at: DateTime<Utc>,
}

impl DetectionSession {
    /// Starts a session with a fresh v4 id, stamped now.
    pub fn new(detection_type: DetectionType) -> Self {
        Self {
            session_id: Uuid::new_v4().to_string(),
            detection_type,
            created_at: Utc::now(),
        }
    }
}

/// A persisted face result belonging to one session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionResult {
    pub session_id: String,
    pub image_path: Option<PathBuf>,
    pub region: FaceRegion,
    pub emotions: EmotionScores,
    pub dominant_emotion: Emotion,
    pub confidence_score: f64,
    pub processed_at: DateTime<Utc>,
}

impl DetectionResult {
    pub fn from_face(session_id: &str, image_path: Option<&Path>, face: &FaceResult) -> Self {
        Self {
            session_id: session_id.to_string(),
            image_path: image_path.map(Path::to_path_buf),
            region: face.region(),
            emotions: *face.scores(),
            dominant_emotion: face.dominant(),
            confidence_score: face.confidence(),
            processed_at: Utc::now(),
        }
    }
}

/// A session together with every result saved under it, in save order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionRecord {
    pub session: DetectionSession,
    pub results: Vec<DetectionResult>,
}
