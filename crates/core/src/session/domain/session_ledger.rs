use serde::{Deserialize, Serialize};

use super::detection_session::{DetectionResult, DetectionSession, SessionRecord};
use super::session_store::SessionError;

/// The complete contents of a session store, in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionLedger {
    sessions: Vec<DetectionSession>,
    results: Vec<DetectionResult>,
}

impl SessionLedger {
    pub fn insert_session(&mut self, session: DetectionSession) {
        self.sessions.push(session);
    }

    pub fn insert_result(&mut self, result: DetectionResult) -> Result<(), SessionError> {
        if !self.contains(&result.session_id) {
            return Err(SessionError::NotFound(result.session_id));
        }
        self.results.push(result);
        Ok(())
    }

    pub fn contains(&self, session_id: &str) -> bool {
        self.sessions.iter().any(|s| s.session_id == session_id)
    }

    /// Sessions by `created_at` descending; equal timestamps list the later
    /// insertion first.
    pub fn newest(&self, limit: Option<usize>) -> Vec<DetectionSession> {
        let mut sessions: Vec<_> = self.sessions.iter().rev().cloned().collect();
        sessions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        if let Some(limit) = limit {
            sessions.truncate(limit);
        }
        sessions
    }

    pub fn record(&self, session_id: &str) -> Result<SessionRecord, SessionError> {
        let session = self
            .sessions
            .iter()
            .find(|s| s.session_id == session_id)
            .cloned()
            .ok_or_else(|| SessionError::NotFound(session_id.to_string()))?;
        let results = self
            .results
            .iter()
            .filter(|r| r.session_id == session_id)
            .cloned()
            .collect();
        Ok(SessionRecord { session, results })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregation::face_result::aggregate;
    use crate::classification::domain::emotion::EmotionScores;
    use crate::session::domain::detection_session::DetectionType;
    use crate::shared::region::FaceRegion;
    use chrono::DateTime;

    fn session_at(id: &str, secs: i64) -> DetectionSession {
        DetectionSession {
            session_id: id.to_string(),
            detection_type: DetectionType::Upload,
            created_at: DateTime::from_timestamp(secs, 0).unwrap(),
        }
    }

    fn result_for(id: &str) -> DetectionResult {
        let face = aggregate(
            FaceRegion {
                x: 0,
                y: 0,
                width: 4,
                height: 4,
            },
            EmotionScores::fallback(),
        );
        DetectionResult::from_face(id, None, &face)
    }

    fn ids(sessions: &[DetectionSession]) -> Vec<&str> {
        sessions.iter().map(|s| s.session_id.as_str()).collect()
    }

    #[test]
    fn test_newest_orders_by_created_at_desc() {
        let mut ledger = SessionLedger::default();
        ledger.insert_session(session_at("old", 100));
        ledger.insert_session(session_at("new", 300));
        ledger.insert_session(session_at("mid", 200));

        assert_eq!(ids(&ledger.newest(None)), vec!["new", "mid", "old"]);
        assert_eq!(ids(&ledger.newest(Some(2))), vec!["new", "mid"]);
        assert!(ledger.newest(Some(0)).is_empty());
    }

    #[test]
    fn test_equal_timestamps_list_later_insert_first() {
        let mut ledger = SessionLedger::default();
        ledger.insert_session(session_at("first", 100));
        ledger.insert_session(session_at("second", 100));
        ledger.insert_session(session_at("third", 100));

        assert_eq!(ids(&ledger.newest(None)), vec!["third", "second", "first"]);
    }

    #[test]
    fn test_record_collects_only_its_results() {
        let mut ledger = SessionLedger::default();
        ledger.insert_session(session_at("a", 1));
        ledger.insert_session(session_at("b", 2));
        ledger.insert_result(result_for("a")).unwrap();
        ledger.insert_result(result_for("b")).unwrap();
        ledger.insert_result(result_for("a")).unwrap();

        let record = ledger.record("a").unwrap();
        assert_eq!(record.session.session_id, "a");
        assert_eq!(record.results.len(), 2);
        assert!(record.results.iter().all(|r| r.session_id == "a"));
    }

    #[test]
    fn test_unknown_ids_are_not_found() {
        let mut ledger = SessionLedger::default();
        assert!(matches!(
            ledger.record("ghost"),
            Err(SessionError::NotFound(id)) if id == "ghost"
        ));
        assert!(matches!(
            ledger.insert_result(result_for("ghost")),
            Err(SessionError::NotFound(_))
        ));
    }

    #[test]
    fn test_missing_fields_deserialize_empty() {
        let ledger: SessionLedger = serde_json::from_str("{}").unwrap();
        assert_eq!(ledger, SessionLedger::default());
    }
}
