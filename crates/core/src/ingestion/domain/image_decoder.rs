use std::path::PathBuf;

use thiserror::Error;

use super::image_source::ImageSource;
use crate::shared::pixel_buffer::PixelBuffer;

/// Input could not be turned into a pixel buffer.
///
/// The pipeline recovers from every variant locally: the caller gets an
/// empty face list plus the error message, never a fault.
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("malformed input: {0}")]
    MalformedInput(String),
    #[error("unreadable image: {0}")]
    Image(#[from] image::ImageError),
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Decodes an [`ImageSource`] into an RGB [`PixelBuffer`].
pub trait ImageDecoder: Send + Sync {
    fn decode(&self, source: &ImageSource) -> Result<PixelBuffer, DecodeError>;
}
