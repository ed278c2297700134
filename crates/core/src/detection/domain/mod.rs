pub mod bounded_locator;
pub mod face_locator;
