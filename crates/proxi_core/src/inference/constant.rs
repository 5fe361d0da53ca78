use super::InferenceEngine;
use crate::error::Result;

/// Model-free engine that reports the same score for every input.
///
/// Used for dry runs of the serving and replay paths when no model file is
/// available, and as a deterministic stand-in in tests.
#[derive(Debug, Clone, Copy)]
pub struct ConstantEngine {
    score: f32,
}

impl ConstantEngine {
    pub fn new(score: f32) -> Self {
        Self { score }
    }

    pub fn score(&self) -> f32 {
        self.score
    }
}

impl InferenceEngine for ConstantEngine {
    fn infer(&self, _input: &[u8]) -> Result<Vec<f32>> {
        Ok(vec![self.score])
    }

    fn describe(&self) -> String {
        format!("constant({})", self.score)
    }
}
