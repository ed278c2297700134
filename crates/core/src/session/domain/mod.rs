pub mod detection_session;
pub mod session_ledger;
pub mod session_store;
