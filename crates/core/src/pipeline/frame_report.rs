use serde::Serialize;

use crate::aggregation::face_result::FrameResult;
use crate::ingestion::domain::image_decoder::DecodeError;
use crate::shared::constants::{NO_FACE_MESSAGE, NO_FRAME_DATA_MESSAGE};

/// Reply to a single live-frame request.
///
/// `success` is false only when the request carried no frame at all. A
/// frame that could not be decoded, or that shows no face, still succeeds
/// with an empty face list; `error` and `message` say why.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FrameReport {
    pub success: bool,
    pub faces: FrameResult,
    pub count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl FrameReport {
    pub fn missing_payload() -> Self {
        Self {
            success: false,
            faces: Vec::new(),
            count: 0,
            message: None,
            error: Some(NO_FRAME_DATA_MESSAGE.to_string()),
        }
    }

    pub fn ingestion_failed(error: &DecodeError) -> Self {
        Self {
            success: true,
            faces: Vec::new(),
            count: 0,
            message: None,
            error: Some(error.to_string()),
        }
    }

    pub fn from_faces(faces: FrameResult) -> Self {
        let message = faces.is_empty().then(|| NO_FACE_MESSAGE.to_string());
        Self {
            success: true,
            count: faces.len(),
            faces,
            message,
            error: None,
        }
    }

    pub fn has_ingestion_error(&self) -> bool {
        self.success && self.error.is_some()
    }
}
