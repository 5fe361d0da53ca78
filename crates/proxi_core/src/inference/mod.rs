//! Inference backends.
//!
//! The classifier only sees the [`InferenceEngine`] trait: a fixed-length
//! vector of quantized samples goes in, the model's flattened output comes
//! out. Element 0 of the output is the decision score.

pub mod constant;
pub mod onnx;

pub use constant::ConstantEngine;
pub use onnx::{InputType, OnnxEngine};

use std::sync::Arc;

use crate::error::{ProxiError, Result};

pub trait InferenceEngine {
    /// Runs one inference over `input` (one value per time step).
    fn infer(&self, input: &[u8]) -> Result<Vec<f32>>;

    /// Short human-readable description for logs and health checks.
    fn describe(&self) -> String;
}

impl<E: InferenceEngine + ?Sized> InferenceEngine for Arc<E> {
    fn infer(&self, input: &[u8]) -> Result<Vec<f32>> {
        (**self).infer(input)
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}

impl<E: InferenceEngine + ?Sized> InferenceEngine for Box<E> {
    fn infer(&self, input: &[u8]) -> Result<Vec<f32>> {
        (**self).infer(input)
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}

/// Engine handle shared across request handlers.
pub type SharedEngine = Arc<dyn InferenceEngine + Send + Sync>;

/// Converts a reading to the model's 8-bit domain: truncates toward zero and
/// saturates to 0..=255. NaN maps to 0.
pub fn quantize(value: f64) -> u8 {
    value as u8
}

/// Single-shot prediction without any smoothing or state: exactly
/// `expected_len` readings are quantized and passed to the engine, and the
/// full output vector is returned.
pub fn predict_raw<E>(engine: &E, inputs: &[f64], expected_len: usize) -> Result<Vec<f32>>
where
    E: InferenceEngine + ?Sized,
{
    if inputs.len() != expected_len {
        return Err(ProxiError::InputLength {
            expected: expected_len,
            got: inputs.len(),
        });
    }
    let quantized: Vec<u8> = inputs.iter().map(|&v| quantize(v)).collect();
    engine.infer(&quantized)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quantize_truncates_and_saturates() {
        assert_eq!(quantize(10.9), 10);
        assert_eq!(quantize(-3.0), 0);
        assert_eq!(quantize(300.0), 255);
        assert_eq!(quantize(f64::NAN), 0);
    }

    #[test]
    fn test_predict_raw_rejects_wrong_length() {
        let engine = ConstantEngine::new(1.0);
        let err = predict_raw(&engine, &[1.0; 9], 10).unwrap_err();
        assert!(matches!(
            err,
            ProxiError::InputLength {
                expected: 10,
                got: 9
            }
        ));
        assert!(err.is_client_error());
    }

    #[test]
    fn test_predict_raw_through_shared_handle() {
        let engine: SharedEngine = Arc::new(ConstantEngine::new(42.0));
        let out = predict_raw(&engine, &[5.0; 10], 10).unwrap();
        assert_eq!(out, vec![42.0]);
    }
}
