use ndarray::ArrayView3;

use crate::shared::region::FaceRegion;

/// A decoded image: contiguous RGB bytes in row-major order.
///
/// Every ingestion path produces RGB, and every capability consumes RGB.
/// Channel conversion happens at I/O boundaries only.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PixelBuffer {
    data: Vec<u8>,
    width: u32,
    height: u32,
    channels: u8,
}

impl PixelBuffer {
    pub fn new(data: Vec<u8>, width: u32, height: u32, channels: u8) -> Self {
        debug_assert_eq!(
            data.len(),
            (width as usize) * (height as usize) * (channels as usize),
            "data length must equal width * height * channels"
        );
        Self {
            data,
            width,
            height,
            channels,
        }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> u8 {
        self.channels
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn as_ndarray(&self) -> Option<ArrayView3<'_, u8>> {
        ArrayView3::from_shape(self.shape(), &self.data).ok()
    }

    /// Copies the pixels under `region` into a new buffer.
    ///
    /// Returns `None` when the region is empty or reaches past the buffer.
    pub fn crop(&self, region: &FaceRegion) -> Option<PixelBuffer> {
        if region.is_empty() || !region.fits_within(self.width, self.height) {
            return None;
        }

        let channels = self.channels as usize;
        let row_len = self.width as usize * channels;
        let x1 = region.x as usize * channels;
        let x2 = x1 + region.width as usize * channels;
        let y1 = region.y as usize;
        let y2 = y1 + region.height as usize;

        let mut data = Vec::with_capacity((x2 - x1) * (y2 - y1));
        for row in y1..y2 {
            let start = row * row_len;
            data.extend_from_slice(&self.data[start + x1..start + x2]);
        }

        Some(PixelBuffer::new(
            data,
            region.width,
            region.height,
            self.channels,
        ))
    }

    fn shape(&self) -> (usize, usize, usize) {
        (
            self.height as usize,
            self.width as usize,
            self.channels as usize,
        )
    }
}
