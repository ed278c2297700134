use std::path::{Path, PathBuf};

use thiserror::Error;

use super::detection_session::{DetectionResult, DetectionSession, DetectionType, SessionRecord};
use crate::aggregation::face_result::FaceResult;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Session not found: {0}")]
    NotFound(String),
    #[error("session store I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("session store is corrupt: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Persists sessions and the face results saved under them.
///
/// The pipeline never depends on this; hosts call it after a run.
pub trait SessionStore: Send + Sync {
    fn create_session(&self, detection_type: DetectionType) -> Result<DetectionSession, SessionError>;

    /// Saves one face under an existing session.
    fn save_result(
        &self,
        session_id: &str,
        image_path: Option<&Path>,
        face: &FaceResult,
    ) -> Result<DetectionResult, SessionError>;

    /// Sessions newest first. `None` returns all of them.
    fn list_sessions(&self, limit: Option<usize>) -> Result<Vec<DetectionSession>, SessionError>;

    fn get_session(&self, session_id: &str) -> Result<SessionRecord, SessionError>;
}
