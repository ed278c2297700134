use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use crate::aggregation::face_result::FaceResult;
use crate::session::domain::detection_session::{
    DetectionResult, DetectionSession, DetectionType, SessionRecord,
};
use crate::session::domain::session_ledger::SessionLedger;
use crate::session::domain::session_store::{SessionError, SessionStore};

/// Keeps sessions in process memory. Nothing survives the process.
#[derive(Default)]
pub struct InMemorySessionStore {
    ledger: Mutex<SessionLedger>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, SessionLedger> {
        self.ledger.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl SessionStore for InMemorySessionStore {
    fn create_session(&self, detection_type: DetectionType) -> Result<DetectionSession, SessionError> {
        let session = DetectionSession::new(detection_type);
        self.lock().insert_session(session.clone());
        Ok(session)
    }

    fn save_result(
        &self,
        session_id: &str,
        image_path: Option<&Path>,
        face: &FaceResult,
    ) -> Result<DetectionResult, SessionError> {
        let result = DetectionResult::from_face(session_id, image_path, face);
        self.lock().insert_result(result.clone())?;
        Ok(result)
    }

    fn list_sessions(&self, limit: Option<usize>) -> Result<Vec<DetectionSession>, SessionError> {
        Ok(self.lock().newest(limit))
    }

    fn get_session(&self, session_id: &str) -> Result<SessionRecord, SessionError> {
        self.lock().record(session_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregation::face_result::aggregate;
    use crate::classification::domain::emotion::{Emotion, EmotionScores};
    use crate::shared::region::FaceRegion;

    fn happy_face() -> FaceResult {
        aggregate(
            FaceRegion {
                x: 3,
                y: 4,
                width: 20,
                height: 20,
            },
            EmotionScores::from_pairs([(Emotion::Happy, 90.0), (Emotion::Neutral, 10.0)]),
        )
    }

    #[test]
    fn test_create_save_and_get() {
        let store = InMemorySessionStore::new();
        let session = store.create_session(DetectionType::Webcam).unwrap();

        let saved = store
            .save_result(&session.session_id, None, &happy_face())
            .unwrap();
        assert_eq!(saved.confidence_score, 90.0);

        let record = store.get_session(&session.session_id).unwrap();
        assert_eq!(record.session, session);
        assert_eq!(record.results, vec![saved]);
    }

    #[test]
    fn test_save_to_unknown_session_fails() {
        let store = InMemorySessionStore::new();
        let err = store.save_result("missing", None, &happy_face()).unwrap_err();
        assert_eq!(err.to_string(), "Session not found: missing");
    }

    #[test]
    fn test_list_sessions_newest_first_with_limit() {
        let store = InMemorySessionStore::new();
        let created: Vec<_> = (0..7)
            .map(|_| store.create_session(DetectionType::Upload).unwrap())
            .collect();

        let listed = store.list_sessions(Some(5)).unwrap();

        assert_eq!(listed.len(), 5);
        assert_eq!(listed[0], created[6]);
        assert_eq!(listed[4], created[2]);
        assert_eq!(store.list_sessions(None).unwrap().len(), 7);
    }

    #[test]
    fn test_shared_across_threads() {
        let store = InMemorySessionStore::new();
        let session = store.create_session(DetectionType::Upload).unwrap();

        std::thread::scope(|scope| {
            for _ in 0..4 {
                scope.spawn(|| {
                    store
                        .save_result(&session.session_id, None, &happy_face())
                        .unwrap();
                });
            }
        });

        assert_eq!(store.get_session(&session.session_id).unwrap().results.len(), 4);
    }
}
