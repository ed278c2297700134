use base64::Engine;
use image::DynamicImage;

use crate::ingestion::domain::image_decoder::{DecodeError, ImageDecoder};
use crate::ingestion::domain::image_source::{data_url_payload, ImageSource};
use crate::shared::pixel_buffer::PixelBuffer;

/// Decodes files, byte buffers and base64 data URLs with the `image` crate.
///
/// The format is sniffed from content rather than file extension, so a
/// mislabelled upload still decodes. Alpha and grayscale inputs are
/// converted to 8-bit RGB.
pub struct ImageCrateDecoder;

impl ImageCrateDecoder {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ImageCrateDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageDecoder for ImageCrateDecoder {
    fn decode(&self, source: &ImageSource) -> Result<PixelBuffer, DecodeError> {
        let image = match source {
            ImageSource::Path(path) => {
                let bytes = std::fs::read(path).map_err(|e| DecodeError::Io {
                    path: path.clone(),
                    source: e,
                })?;
                decode_bytes(&bytes)?
            }
            ImageSource::Bytes(bytes) => decode_bytes(bytes)?,
            ImageSource::DataUrl(data_url) => {
                let payload = data_url_payload(data_url)?;
                let bytes = base64::engine::general_purpose::STANDARD
                    .decode(payload)
                    .map_err(|e| DecodeError::MalformedInput(format!("invalid base64 payload: {e}")))?;
                decode_bytes(&bytes)?
            }
        };
        Ok(to_rgb_buffer(image))
    }
}

fn decode_bytes(bytes: &[u8]) -> Result<DynamicImage, DecodeError> {
    if bytes.is_empty() {
        return Err(DecodeError::MalformedInput("empty image data".to_string()));
    }
    Ok(image::load_from_memory(bytes)?)
}

fn to_rgb_buffer(image: DynamicImage) -> PixelBuffer {
    let rgb = image.into_rgb8();
    let (width, height) = rgb.dimensions();
    PixelBuffer::new(rgb.into_raw(), width, height, 3)
}
