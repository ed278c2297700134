pub mod emotion;
pub mod emotion_classifier;
pub mod fallback_classifier;
