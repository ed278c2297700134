//! BlazeFace face locator using ONNX Runtime via `ort`.
//!
//! Produces unclipped face boxes in buffer coordinates; bounds handling is
//! left to [`BoundedLocator`](crate::detection::domain::bounded_locator::BoundedLocator).

use std::path::Path;
use std::sync::Mutex;

use crate::detection::domain::face_locator::{DetectorFault, FaceLocator};
use crate::shared::onnx_session::load_session;
use crate::shared::pixel_buffer::PixelBuffer;
use crate::shared::region::DetectedBox;

/// BlazeFace model input resolution.
const INPUT_SIZE: u32 = 128;

/// Default confidence threshold.
pub const DEFAULT_CONFIDENCE: f64 = 0.5;

/// NMS IoU threshold.
const NMS_IOU_THRESH: f64 = 0.3;

/// Number of BlazeFace anchors (short-range model).
const NUM_ANCHORS: usize = 896;

/// BlazeFace locator backed by an ONNX Runtime session.
///
/// `Session::run` needs exclusive access, so concurrent callers serialize
/// on the session mutex. Everything else is read-only after construction.
pub struct OnnxBlazefaceLocator {
    session: Mutex<ort::session::Session>,
    confidence: f64,
    anchors: Vec<[f32; 2]>,
}

impl OnnxBlazefaceLocator {
    /// Load a BlazeFace ONNX model.
    pub fn new(
        model_path: &Path,
        confidence: f64,
        intra_threads: usize,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let session = load_session(model_path, intra_threads)?;
        Ok(Self {
            session: Mutex::new(session),
            confidence,
            anchors: generate_anchors(),
        })
    }

    fn infer(&self, buffer: &PixelBuffer) -> Result<Vec<DetectedBox>, Box<dyn std::error::Error>> {
        let fw = buffer.width();
        let fh = buffer.height();

        // 1. Preprocess: resize to 128x128, normalize to [0,1], NCHW
        let input_tensor = preprocess(buffer, INPUT_SIZE)?;

        // 2. Inference. Outputs are copied out so the lock is held only
        //    for the duration of `run`.
        let (reg_data, score_data) = {
            let mut session = self
                .session
                .lock()
                .map_err(|_| "face detector session lock poisoned")?;
            let input_value = ort::value::Tensor::from_array(input_tensor)?;
            let outputs = session.run(ort::inputs![input_value])?;

            // BlazeFace outputs two tensors:
            // - regressors: [1, 896, 16] (box deltas + keypoints)
            // - classificators: [1, 896, 1] (confidence scores)
            if outputs.len() < 2 {
                return Err(
                    format!("BlazeFace model expected 2 outputs, got {}", outputs.len()).into(),
                );
            }

            let regressors = outputs[0].try_extract_array::<f32>()?;
            let scores = outputs[1].try_extract_array::<f32>()?;
            (
                regressors.iter().copied().collect::<Vec<f32>>(),
                scores.iter().copied().collect::<Vec<f32>>(),
            )
        };

        // 3. Decode anchor boxes + filter by confidence
        let mut raw_dets = decode_detections(
            &reg_data,
            &score_data,
            &self.anchors,
            self.confidence as f32,
            fw,
            fh,
        );

        // 4. NMS
        let kept = nms(&mut raw_dets, NMS_IOU_THRESH);

        Ok(kept
            .iter()
            .map(|d| {
                let x = d.x1.round() as i32;
                let y = d.y1.round() as i32;
                let w = (d.x2 - d.x1).round() as i32;
                let h = (d.y2 - d.y1).round() as i32;
                DetectedBox::new(x, y, w, h)
            })
            .collect())
    }
}

impl FaceLocator for OnnxBlazefaceLocator {
    fn locate(&self, buffer: &PixelBuffer) -> Result<Vec<DetectedBox>, DetectorFault> {
        if buffer.is_empty() {
            return Ok(Vec::new());
        }
        self.infer(buffer)
            .map_err(|e| DetectorFault::Backend(e.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Preprocessing
// ---------------------------------------------------------------------------

/// Resize buffer to `size × size` and normalize to [0,1] NCHW float32.
fn preprocess(
    buffer: &PixelBuffer,
    size: u32,
) -> Result<ndarray::Array4<f32>, Box<dyn std::error::Error>> {
    let src = buffer
        .as_ndarray()
        .ok_or("pixel buffer does not match its dimensions")?;
    let src_h = buffer.height() as usize;
    let src_w = buffer.width() as usize;
    let s = size as usize;

    let mut tensor = ndarray::Array4::<f32>::zeros((1, 3, s, s));

    for y in 0..s {
        let src_y = (((y as f64 + 0.5) * src_h as f64 / s as f64) as usize).min(src_h - 1);
        for x in 0..s {
            let src_x = (((x as f64 + 0.5) * src_w as f64 / s as f64) as usize).min(src_w - 1);
            for c in 0..3 {
                tensor[[0, c, y, x]] = src[[src_y, src_x, c]] as f32 / 255.0;
            }
        }
    }

    Ok(tensor)
}

// ---------------------------------------------------------------------------
// Anchor generation (BlazeFace short-range)
// ---------------------------------------------------------------------------

/// Generate BlazeFace anchors for the short-range model.
///
/// The short-range model uses two feature map sizes: 16×16 and 8×8,
/// with 2 and 6 anchors per cell respectively.
fn generate_anchors() -> Vec<[f32; 2]> {
    let strides = [(8, 2), (16, 6)]; // (stride, anchors_per_cell)
    let mut anchors = Vec::with_capacity(NUM_ANCHORS);

    for &(stride, num) in &strides {
        let grid_size = INPUT_SIZE as usize / stride;
        for y in 0..grid_size {
            for x in 0..grid_size {
                let cx = (x as f32 + 0.5) / grid_size as f32;
                let cy = (y as f32 + 0.5) / grid_size as f32;
                for _ in 0..num {
                    anchors.push([cx, cy]);
                }
            }
        }
    }

    anchors
}

// ---------------------------------------------------------------------------
// Decoding + NMS
// ---------------------------------------------------------------------------

#[derive(Clone, Debug)]
struct RawDet {
    x1: f64,
    y1: f64,
    x2: f64,
    y2: f64,
    score: f64,
}

/// Turns regressor deltas into buffer-space boxes for anchors above `confidence`.
///
/// Boxes are left unclamped.
fn decode_detections(
    reg_data: &[f32],
    score_data: &[f32],
    anchors: &[[f32; 2]],
    confidence: f32,
    fw: u32,
    fh: u32,
) -> Vec<RawDet> {
    let mut dets = Vec::new();
    let num_anchors = anchors.len().min(NUM_ANCHORS);

    for (i, &raw_score) in score_data.iter().enumerate().take(num_anchors) {
        let score = sigmoid(raw_score);
        if score < confidence {
            continue;
        }

        let anchor = &anchors[i];
        let reg_offset = i * 16;
        if reg_offset + 4 > reg_data.len() {
            break;
        }

        // Decode box center + size relative to anchor
        let cx = anchor[0] + reg_data[reg_offset] / INPUT_SIZE as f32;
        let cy = anchor[1] + reg_data[reg_offset + 1] / INPUT_SIZE as f32;
        let w = reg_data[reg_offset + 2] / INPUT_SIZE as f32;
        let h = reg_data[reg_offset + 3] / INPUT_SIZE as f32;

        dets.push(RawDet {
            x1: ((cx - w / 2.0) * fw as f32) as f64,
            y1: ((cy - h / 2.0) * fh as f32) as f64,
            x2: ((cx + w / 2.0) * fw as f32) as f64,
            y2: ((cy + h / 2.0) * fh as f32) as f64,
            score: score as f64,
        });
    }

    dets
}

fn nms(dets: &mut [RawDet], iou_thresh: f64) -> Vec<RawDet> {
    dets.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut keep = Vec::new();
    let mut suppressed = vec![false; dets.len()];

    for i in 0..dets.len() {
        if suppressed[i] {
            continue;
        }
        keep.push(dets[i].clone());
        for j in (i + 1)..dets.len() {
            if suppressed[j] {
                continue;
            }
            if bbox_iou(&dets[i], &dets[j]) > iou_thresh {
                suppressed[j] = true;
            }
        }
    }
    keep
}

fn bbox_iou(a: &RawDet, b: &RawDet) -> f64 {
    let x1 = a.x1.max(b.x1);
    let y1 = a.y1.max(b.y1);
    let x2 = a.x2.min(b.x2);
    let y2 = a.y2.min(b.y2);

    let inter = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
    if inter == 0.0 {
        return 0.0;
    }
    let area_a = (a.x2 - a.x1) * (a.y2 - a.y1);
    let area_b = (b.x2 - b.x1) * (b.y2 - b.y1);
    inter / (area_a + area_b - inter)
}

fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
