use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[cfg(feature = "cli")]
use clap::ValueEnum;

use super::InferenceEngine;
use crate::error::{ProxiError, Result};

/// Element type of the model's input tensor.
///
/// Values are always quantized to 0..=255 first; `F32` only widens them for
/// graphs that were exported with a float input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(ValueEnum))]
#[serde(rename_all = "lowercase")]
pub enum InputType {
    #[default]
    U8,
    F32,
}

/// Binary time-series classifier loaded from an ONNX file via tract.
///
/// The graph takes one sequence shaped `(1, input_len, 1)` and its first
/// output element is read as the decision score.
pub struct OnnxEngine {
    #[allow(clippy::type_complexity)]
    model: tract_onnx::prelude::SimplePlan<
        tract_onnx::prelude::TypedFact,
        Box<dyn tract_onnx::prelude::TypedOp>,
        tract_onnx::prelude::Graph<
            tract_onnx::prelude::TypedFact,
            Box<dyn tract_onnx::prelude::TypedOp>,
        >,
    >,
    input_len: usize,
    input_type: InputType,
    path: PathBuf,
}

impl OnnxEngine {
    /// Loads and optimizes the model at `path` with its input fixed to
    /// `(1, input_len, 1)` of `input_type`.
    pub fn load<P: AsRef<Path>>(path: P, input_len: usize, input_type: InputType) -> Result<Self> {
        use tract_onnx::prelude::*;

        let path = path.as_ref();
        log::info!(
            "Loading ONNX model from {} (input {:?} x {})",
            path.display(),
            input_type,
            input_len
        );

        let fact: InferenceFact = match input_type {
            InputType::U8 => u8::fact([1, input_len, 1]).into(),
            InputType::F32 => f32::fact([1, input_len, 1]).into(),
        };

        let model = tract_onnx::onnx()
            .model_for_path(path)
            .with_context(|| format!("Failed to load ONNX model {}", path.display()))?
            .with_input_fact(0, fact)
            .context("Failed to set input fact")?
            .into_optimized()
            .context("Failed to optimize model")?
            .into_runnable()
            .context("Failed to create runnable model")?;

        Ok(Self {
            model,
            input_len,
            input_type,
            path: path.to_path_buf(),
        })
    }

    pub fn input_len(&self) -> usize {
        self.input_len
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn run(&self, input: &[u8]) -> anyhow::Result<Vec<f32>> {
        use tract_onnx::prelude::*;

        let shape = (1, self.input_len, 1);
        let tensor: Tensor = match self.input_type {
            InputType::U8 => tract_ndarray::Array3::from_shape_vec(shape, input.to_vec())
                .context("Failed to create input array")?
                .into(),
            InputType::F32 => tract_ndarray::Array3::from_shape_vec(
                shape,
                input.iter().map(|&v| f32::from(v)).collect(),
            )
            .context("Failed to create input array")?
            .into(),
        };

        let result = self
            .model
            .run(tvec![tensor.into()])
            .context("Failed to run inference")?;

        let output = result
            .first()
            .context("Model produced no outputs")?
            .cast_to::<f32>()
            .context("Failed to read output as f32")?;

        Ok(output
            .as_slice::<f32>()
            .context("Failed to extract output")?
            .to_vec())
    }
}

impl InferenceEngine for OnnxEngine {
    fn infer(&self, input: &[u8]) -> Result<Vec<f32>> {
        if input.len() != self.input_len {
            return Err(ProxiError::InputLength {
                expected: self.input_len,
                got: input.len(),
            });
        }

        let output = self.run(input)?;
        if output.is_empty() {
            return Err(ProxiError::EmptyOutput);
        }
        Ok(output)
    }

    fn describe(&self) -> String {
        format!("onnx({})", self.path.display())
    }
}
