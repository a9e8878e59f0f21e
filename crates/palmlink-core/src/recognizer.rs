//! Hand gesture recognizer via ONNX Runtime.
//!
//! Runs an image classifier exported with one logit per [`GestureLabel`]
//! (class order as in [`GestureLabel::ALL`]) over a resized RGB frame.

use crate::types::{Gesture, GestureLabel};
use image::imageops::{self, FilterType};
use image::RgbImage;
use ndarray::Array4;
use ort::session::Session;
use ort::value::TensorRef;
use std::path::Path;
use thiserror::Error;

const GESTURE_INPUT_SIZE: u32 = 224;
const GESTURE_NUM_CLASSES: usize = GestureLabel::ALL.len();

#[derive(Error, Debug)]
pub enum ClassifierError {
    #[error("model file not found: {0}")]
    ModelNotFound(String),
    #[error("frame buffer too short: expected {expected} bytes, got {actual}")]
    InvalidFrame { expected: usize, actual: usize },
    #[error("inference failed: {0}")]
    InferenceFailed(String),
    #[error("ort: {0}")]
    Ort(#[from] ort::Error),
}

/// Produces ranked gesture candidates for a packed RGB8 frame.
pub trait GestureClassifier {
    /// Candidates sorted by descending score; empty when no hand pose is recognized.
    fn classify(
        &mut self,
        rgb: &[u8],
        width: u32,
        height: u32,
    ) -> Result<Vec<Gesture>, ClassifierError>;
}

/// Label of the highest-ranked candidate. Lower-ranked candidates are ignored.
pub fn top_label(gestures: &[Gesture]) -> Option<GestureLabel> {
    gestures.first().map(|g| g.label)
}

/// ONNX gesture classifier.
pub struct GestureRecognizer {
    session: Session,
    min_confidence: f32,
}

impl GestureRecognizer {
    /// Load the gesture ONNX model. Candidates scoring below `min_confidence`
    /// are dropped from every result.
    pub fn load(model_path: &str, min_confidence: f32) -> Result<Self, ClassifierError> {
        if !Path::new(model_path).exists() {
            return Err(ClassifierError::ModelNotFound(model_path.to_string()));
        }

        let session = Session::builder()?
            .with_intra_threads(2)?
            .commit_from_file(model_path)?;

        tracing::info!(
            path = model_path,
            inputs = ?session.inputs().iter().map(|i| (i.name(), i.dtype())).collect::<Vec<_>>(),
            outputs = ?session.outputs().iter().map(|o| o.name()).collect::<Vec<_>>(),
            min_confidence,
            "loaded gesture model"
        );

        Ok(Self {
            session,
            min_confidence,
        })
    }

    /// Resize a packed RGB8 frame to the model input and lay it out as NCHW in [0, 1].
    fn preprocess(rgb: &[u8], width: u32, height: u32) -> Result<Array4<f32>, ClassifierError> {
        let expected = (width * height * 3) as usize;
        if rgb.len() < expected {
            return Err(ClassifierError::InvalidFrame {
                expected,
                actual: rgb.len(),
            });
        }

        let frame = RgbImage::from_raw(width, height, rgb[..expected].to_vec()).ok_or(
            ClassifierError::InvalidFrame {
                expected,
                actual: rgb.len(),
            },
        )?;
        let resized = imageops::resize(
            &frame,
            GESTURE_INPUT_SIZE,
            GESTURE_INPUT_SIZE,
            FilterType::Triangle,
        );

        let size = GESTURE_INPUT_SIZE as usize;
        let mut tensor = Array4::<f32>::zeros((1, 3, size, size));
        for (x, y, pixel) in resized.enumerate_pixels() {
            for c in 0..3 {
                tensor[[0, c, y as usize, x as usize]] = pixel[c] as f32 / 255.0;
            }
        }

        Ok(tensor)
    }
}

impl GestureClassifier for GestureRecognizer {
    fn classify(
        &mut self,
        rgb: &[u8],
        width: u32,
        height: u32,
    ) -> Result<Vec<Gesture>, ClassifierError> {
        let input = Self::preprocess(rgb, width, height)?;

        let outputs = self.session.run(ort::inputs![TensorRef::from_array_view(input.view())?])?;

        let (_, logits) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| ClassifierError::InferenceFailed(format!("logit extraction: {e}")))?;

        if logits.len() != GESTURE_NUM_CLASSES {
            return Err(ClassifierError::InferenceFailed(format!(
                "expected {GESTURE_NUM_CLASSES} class logits, got {}",
                logits.len()
            )));
        }

        Ok(rank(&softmax(logits), self.min_confidence))
    }
}

/// Numerically stable softmax.
fn softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().map(|&l| (l - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    if sum > 0.0 {
        exps.iter().map(|e| e / sum).collect()
    } else {
        vec![0.0; logits.len()]
    }
}

/// Pair scores with labels, drop those under `min_confidence`, sort descending.
fn rank(scores: &[f32], min_confidence: f32) -> Vec<Gesture> {
    let mut gestures: Vec<Gesture> = scores
        .iter()
        .enumerate()
        .filter_map(|(i, &score)| {
            let label = GestureLabel::from_index(i)?;
            (score >= min_confidence).then_some(Gesture { label, score })
        })
        .collect();

    gestures.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    gestures
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_softmax_sums_to_one() {
        let probs = softmax(&[1.0, 2.0, 3.0, 0.5, -1.0, 0.0, 4.0, 2.5]);
        let sum: f32 = probs.iter().sum();
        assert!((sum - 1.0).abs() < 1e-5);
        assert!(probs[6] > probs[2]);
    }

    #[test]
    fn test_softmax_large_logits_stable() {
        let probs = softmax(&[1000.0, 1000.0]);
        assert!((probs[0] - 0.5).abs() < 1e-6);
        assert!(probs.iter().all(|p| p.is_finite()));
    }

    #[test]
    fn test_rank_orders_by_score() {
        let scores = [0.05, 0.1, 0.6, 0.0, 0.0, 0.25, 0.0, 0.0];
        let ranked = rank(&scores, 0.0);
        assert_eq!(ranked[0].label, GestureLabel::OpenPalm);
        assert_eq!(ranked[1].label, GestureLabel::ThumbUp);
        assert_eq!(top_label(&ranked), Some(GestureLabel::OpenPalm));
    }

    #[test]
    fn test_rank_drops_low_confidence() {
        let scores = [0.3, 0.0, 0.0, 0.0, 0.0, 0.4, 0.3, 0.0];
        let ranked = rank(&scores, 0.5);
        assert!(ranked.is_empty());
        assert_eq!(top_label(&ranked), None);
    }

    #[test]
    fn test_rank_keeps_unknown_class() {
        let scores = [0.9, 0.0, 0.0, 0.0, 0.0, 0.1, 0.0, 0.0];
        let ranked = rank(&scores, 0.5);
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].label, GestureLabel::Unknown);
    }

    #[test]
    fn test_preprocess_output_shape() {
        let rgb = vec![128u8; 64 * 48 * 3];
        let tensor = GestureRecognizer::preprocess(&rgb, 64, 48).unwrap();
        let size = GESTURE_INPUT_SIZE as usize;
        assert_eq!(tensor.shape(), &[1, 3, size, size]);
    }

    #[test]
    fn test_preprocess_normalization() {
        // Uniform frame stays uniform through the resize.
        let rgb: Vec<u8> = (0..32 * 32).flat_map(|_| [255u8, 0, 51]).collect();
        let tensor = GestureRecognizer::preprocess(&rgb, 32, 32).unwrap();
        assert!((tensor[[0, 0, 10, 10]] - 1.0).abs() < 1e-6);
        assert!(tensor[[0, 1, 10, 10]].abs() < 1e-6);
        assert!((tensor[[0, 2, 10, 10]] - 0.2).abs() < 1e-6);
    }

    #[test]
    fn test_preprocess_rejects_short_buffer() {
        let rgb = vec![0u8; 10];
        let result = GestureRecognizer::preprocess(&rgb, 4, 4);
        assert!(matches!(
            result,
            Err(ClassifierError::InvalidFrame { expected: 48, actual: 10 })
        ));
    }
}
