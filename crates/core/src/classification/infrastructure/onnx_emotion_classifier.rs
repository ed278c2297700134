//! FER+ emotion classifier using ONNX Runtime via `ort`.
//!
//! Expects the ONNX model zoo `emotion-ferplus` network: a `[1, 1, 64, 64]`
//! grayscale input with raw 0-255 intensities and eight output logits.

use std::path::Path;
use std::sync::Mutex;

use crate::classification::domain::emotion::{Emotion, EmotionScores};
use crate::classification::domain::emotion_classifier::{ClassifierFault, EmotionClassifier};
use crate::shared::onnx_session::load_session;
use crate::shared::pixel_buffer::PixelBuffer;

/// Model input resolution.
const INPUT_SIZE: usize = 64;

/// Output index → label. FER+ also scores "contempt", which has no label
/// of its own here and counts towards `disgust`.
const OUTPUT_LABELS: [Emotion; 8] = [
    Emotion::Neutral,
    Emotion::Happy,
    Emotion::Surprise,
    Emotion::Sad,
    Emotion::Angry,
    Emotion::Disgust,
    Emotion::Fear,
    Emotion::Disgust,
];

/// FER+ classifier backed by an ONNX Runtime session.
///
/// Scores are softmax probabilities scaled to percentages.
pub struct OnnxEmotionClassifier {
    session: Mutex<ort::session::Session>,
}

impl OnnxEmotionClassifier {
    pub fn new(model_path: &Path, intra_threads: usize) -> Result<Self, Box<dyn std::error::Error>> {
        Ok(Self {
            session: Mutex::new(load_session(model_path, intra_threads)?),
        })
    }

    fn infer(&self, face: &PixelBuffer) -> Result<Vec<f32>, Box<dyn std::error::Error>> {
        let input_tensor = preprocess(face)?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| "emotion classifier session lock poisoned")?;
        let input_value = ort::value::Tensor::from_array(input_tensor)?;
        let outputs = session.run(ort::inputs![input_value])?;
        let (_, output) = outputs
            .iter()
            .next()
            .ok_or("emotion model produced no outputs")?;
        let logits = output.try_extract_array::<f32>()?;
        Ok(logits.iter().copied().collect())
    }
}

impl EmotionClassifier for OnnxEmotionClassifier {
    fn classify(&self, face: &PixelBuffer) -> Result<EmotionScores, ClassifierFault> {
        if face.is_empty() {
            return Err(ClassifierFault::EmptyCrop);
        }
        if face.channels() != 3 {
            return Err(ClassifierFault::UnsupportedFormat(format!(
                "expected 3 channels, got {}",
                face.channels()
            )));
        }

        let logits = self
            .infer(face)
            .map_err(|e| ClassifierFault::Backend(e.to_string()))?;
        scores_from_logits(&logits)
    }
}

/// Resize to 64×64 grayscale, NCHW float32 in 0-255.
fn preprocess(face: &PixelBuffer) -> Result<ndarray::Array4<f32>, Box<dyn std::error::Error>> {
    let src = face
        .as_ndarray()
        .ok_or("face crop does not match its dimensions")?;
    let src_h = face.height() as usize;
    let src_w = face.width() as usize;
    let s = INPUT_SIZE;

    let mut tensor = ndarray::Array4::<f32>::zeros((1, 1, s, s));

    for y in 0..s {
        let src_y = (((y as f64 + 0.5) * src_h as f64 / s as f64) as usize).min(src_h - 1);
        for x in 0..s {
            let src_x = (((x as f64 + 0.5) * src_w as f64 / s as f64) as usize).min(src_w - 1);
            tensor[[0, 0, y, x]] = luma(
                src[[src_y, src_x, 0]],
                src[[src_y, src_x, 1]],
                src[[src_y, src_x, 2]],
            );
        }
    }

    Ok(tensor)
}

/// ITU-R BT.601 luma.
fn luma(r: u8, g: u8, b: u8) -> f32 {
    0.299 * r as f32 + 0.587 * g as f32 + 0.114 * b as f32
}

fn scores_from_logits(logits: &[f32]) -> Result<EmotionScores, ClassifierFault> {
    if logits.len() != OUTPUT_LABELS.len() {
        return Err(ClassifierFault::Backend(format!(
            "expected {} logits, got {}",
            OUTPUT_LABELS.len(),
            logits.len()
        )));
    }

    if logits.iter().any(|l| !l.is_finite()) {
        return Err(ClassifierFault::Backend(
            "emotion model produced non-finite logits".to_string(),
        ));
    }

    let mut percentages = [0.0f64; 7];
    for (label, p) in OUTPUT_LABELS.iter().zip(softmax(logits)) {
        percentages[label.index()] += f64::from(p) * 100.0;
    }

    Ok(EmotionScores::from_pairs(
        Emotion::ALL.into_iter().zip(percentages),
    ))
}

fn softmax(logits: &[f32]) -> Vec<f32> {
    let max_logit = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().map(|&x| (x - max_logit).exp()).collect();
    let sum: f32 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}
