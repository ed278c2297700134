use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::aggregation::face_result::FaceResult;
use crate::session::domain::detection_session::{
    DetectionResult, DetectionSession, DetectionType, SessionRecord,
};
use crate::session::domain::session_ledger::SessionLedger;
use crate::session::domain::session_store::{SessionError, SessionStore};

/// Stores every session in one JSON document on disk.
///
/// Each write replaces the whole document through a temp file and rename,
/// so a crash mid-write leaves the previous version intact. A missing file
/// reads as an empty store.
pub struct JsonFileSessionStore {
    path: PathBuf,
    // Serializes read-modify-write cycles within this process.
    write_lock: Mutex<()>,
}

impl JsonFileSessionStore {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, SessionError> {
        let store = Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        };
        store.load()?;
        Ok(store)
    }

    /// `<data dir>/MoodLens/sessions.json`.
    pub fn default_path() -> Option<PathBuf> {
        dirs::data_dir().map(|d| d.join("MoodLens").join("sessions.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<SessionLedger, SessionError> {
        match fs::read_to_string(&self.path) {
            Ok(json) => Ok(serde_json::from_str(&json)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(SessionLedger::default()),
            Err(e) => Err(self.io_error(e)),
        }
    }

    fn persist(&self, ledger: &SessionLedger) -> Result<(), SessionError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
        }
        let json = serde_json::to_string_pretty(ledger)?;
        let temp_path = self.path.with_extension("json.tmp");
        if let Err(e) = fs::write(&temp_path, json) {
            let _ = fs::remove_file(&temp_path);
            return Err(self.io_error(e));
        }
        fs::rename(&temp_path, &self.path).map_err(|e| self.io_error(e))
    }

    fn update<T>(
        &self,
        change: impl FnOnce(&mut SessionLedger) -> Result<T, SessionError>,
    ) -> Result<T, SessionError> {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut ledger = self.load()?;
        let value = change(&mut ledger)?;
        self.persist(&ledger)?;
        Ok(value)
    }

    fn io_error(&self, source: std::io::Error) -> SessionError {
        SessionError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl SessionStore for JsonFileSessionStore {
    fn create_session(&self, detection_type: DetectionType) -> Result<DetectionSession, SessionError> {
        let session = DetectionSession::new(detection_type);
        self.update(|ledger| {
            ledger.insert_session(session.clone());
            Ok(())
        })?;
        log::debug!("Created {} session {}", detection_type, session.session_id);
        Ok(session)
    }

    fn save_result(
        &self,
        session_id: &str,
        image_path: Option<&Path>,
        face: &FaceResult,
    ) -> Result<DetectionResult, SessionError> {
        let result = DetectionResult::from_face(session_id, image_path, face);
        self.update(|ledger| ledger.insert_result(result.clone()))?;
        Ok(result)
    }

    fn list_sessions(&self, limit: Option<usize>) -> Result<Vec<DetectionSession>, SessionError> {
        Ok(self.load()?.newest(limit))
    }

    fn get_session(&self, session_id: &str) -> Result<SessionRecord, SessionError> {
        self.load()?.record(session_id)
    }
}
