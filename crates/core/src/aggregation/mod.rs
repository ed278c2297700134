pub mod face_result;
