use std::sync::Arc;

use super::face_locator::FaceLocator;
use crate::shared::pixel_buffer::PixelBuffer;
use crate::shared::region::FaceRegion;

/// Wraps a [`FaceLocator`] so its output is always safe to crop.
///
/// Boxes spilling past the buffer are clipped; boxes with nothing left
/// after clipping are dropped. A detector fault yields no regions.
pub struct BoundedLocator {
    inner: Arc<dyn FaceLocator>,
}

impl BoundedLocator {
    pub fn new(inner: Arc<dyn FaceLocator>) -> Self {
        Self { inner }
    }

    pub fn locate(&self, buffer: &PixelBuffer) -> Vec<FaceRegion> {
        let (w, h) = (buffer.width(), buffer.height());
        let detected = match self.inner.locate(buffer) {
            Ok(boxes) => boxes,
            Err(e) => {
                log::warn!("Face detection failed, treating as no faces: {e}");
                return Vec::new();
            }
        };

        detected
            .into_iter()
            .filter_map(|b| {
                let clipped = b.clip_to(w, h);
                if clipped.is_none() {
                    log::debug!("Dropping degenerate face box {b:?} for {w}x{h} buffer");
                }
                clipped
            })
            .collect()
    }
}
