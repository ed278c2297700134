use serde::{Deserialize, Serialize};

/// A face box as reported by a detector, in pixel coordinates of the
/// analysed buffer.
///
/// Detectors are free to report boxes that spill past the frame edges or
/// have collapsed to nothing; [`DetectedBox::clip_to`] turns them into
/// valid [`FaceRegion`]s.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DetectedBox {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl DetectedBox {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Clips the box to a `frame_w` x `frame_h` buffer.
    ///
    /// Returns `None` when nothing of positive area remains.
    pub fn clip_to(&self, frame_w: u32, frame_h: u32) -> Option<FaceRegion> {
        let x1 = i64::from(self.x).max(0);
        let y1 = i64::from(self.y).max(0);
        let x2 = (i64::from(self.x) + i64::from(self.width)).min(i64::from(frame_w));
        let y2 = (i64::from(self.y) + i64::from(self.height)).min(i64::from(frame_h));

        if x2 <= x1 || y2 <= y1 {
            return None;
        }

        Some(FaceRegion {
            x: x1 as u32,
            y: y1 as u32,
            width: (x2 - x1) as u32,
            height: (y2 - y1) as u32,
        })
    }
}

/// Axis-aligned face region inside a pixel buffer.
///
/// Serialized as `{"x", "y", "w", "h"}`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FaceRegion {
    pub x: u32,
    pub y: u32,
    #[serde(rename = "w")]
    pub width: u32,
    #[serde(rename = "h")]
    pub height: u32,
}

impl FaceRegion {
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn area(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }

    /// True when `x + width <= frame_w` and `y + height <= frame_h`.
    pub fn fits_within(&self, frame_w: u32, frame_h: u32) -> bool {
        u64::from(self.x) + u64::from(self.width) <= u64::from(frame_w)
            && u64::from(self.y) + u64::from(self.height) <= u64::from(frame_h)
    }
}
