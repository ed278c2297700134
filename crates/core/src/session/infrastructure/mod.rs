pub mod in_memory_session_store;
pub mod json_file_session_store;
