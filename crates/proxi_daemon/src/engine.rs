use anyhow::{bail, Context};
use proxi_core::{ConstantEngine, OnnxEngine, SharedEngine};
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::ModelConfig;

/// Loads the engine described by `model`. A constant score takes precedence
/// over a model path so a dry run never touches the model file.
pub fn build_engine(model: &ModelConfig, input_len: usize) -> anyhow::Result<SharedEngine> {
    if let Some(score) = model.constant_score {
        if model.path.is_some() {
            warn!(score, "Constant score configured, ignoring model path");
        }
        info!(score, "Using constant-score engine");
        return Ok(Arc::new(ConstantEngine::new(score)));
    }

    let Some(path) = model.path.as_ref() else {
        bail!("No model configured: pass --model <file.onnx> or --constant-score <score>");
    };

    let start = std::time::Instant::now();
    let engine = OnnxEngine::load(path, input_len, model.input_type)
        .with_context(|| format!("Could not load model {}", path.display()))?;
    info!(
        model = %path.display(),
        input_len,
        input_type = ?model.input_type,
        load_ms = start.elapsed().as_millis() as u64,
        "Model loaded"
    );

    Ok(Arc::new(engine))
}
