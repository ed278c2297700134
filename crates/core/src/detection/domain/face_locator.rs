use thiserror::Error;

use crate::shared::pixel_buffer::PixelBuffer;
use crate::shared::region::DetectedBox;

/// The face detector failed internally. Recovered as "no faces found".
#[derive(Error, Debug)]
pub enum DetectorFault {
    #[error("face detector unavailable: {0}")]
    Unavailable(String),
    #[error("face detector failed: {0}")]
    Backend(String),
}

/// Domain interface for face localization.
///
/// Implementations are shared between concurrent pipeline runs, hence
/// `&self` and `Sync`; any mutable model state must be guarded internally.
pub trait FaceLocator: Send + Sync {
    fn locate(&self, buffer: &PixelBuffer) -> Result<Vec<DetectedBox>, DetectorFault>;
}
