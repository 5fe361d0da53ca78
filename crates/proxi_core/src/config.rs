use serde::{Deserialize, Serialize};

#[cfg(feature = "cli")]
use clap::Args;

use crate::error::{ProxiError, Result};

/// Length of the raw-reading window; the model only runs once it is full.
pub const DEFAULT_WINDOW_LEN: usize = 20;
/// Number of smoothed samples fed to the model per inference.
pub const DEFAULT_MODEL_WINDOW: usize = 10;
pub const DEFAULT_SATURATION: f64 = 100.0;
pub const DEFAULT_SCORE_THRESHOLD: f32 = 200.0;
pub const DEFAULT_DECISION_RATIO: f64 = 0.45;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(Args))]
#[serde(default)]
pub struct ClassifierConfig {
    /// Capacity of the raw and prediction windows
    #[cfg_attr(feature = "cli", arg(long, default_value_t = DEFAULT_WINDOW_LEN))]
    pub window_len: usize,

    /// Number of recent smoothed samples passed to the model
    #[cfg_attr(feature = "cli", arg(long, default_value_t = DEFAULT_MODEL_WINDOW))]
    pub model_window: usize,

    /// Raw readings above this value are saturated to it
    #[cfg_attr(feature = "cli", arg(long, default_value_t = DEFAULT_SATURATION))]
    pub saturation: f64,

    /// Model scores strictly below this count as a positive detection
    #[cfg_attr(feature = "cli", arg(long, default_value_t = DEFAULT_SCORE_THRESHOLD))]
    pub score_threshold: f32,

    /// Fraction of positive detections in the window needed to report true
    #[cfg_attr(feature = "cli", arg(long, default_value_t = DEFAULT_DECISION_RATIO))]
    pub decision_ratio: f64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            window_len: DEFAULT_WINDOW_LEN,
            model_window: DEFAULT_MODEL_WINDOW,
            saturation: DEFAULT_SATURATION,
            score_threshold: DEFAULT_SCORE_THRESHOLD,
            decision_ratio: DEFAULT_DECISION_RATIO,
        }
    }
}

impl ClassifierConfig {
    pub fn validate(&self) -> Result<()> {
        if self.window_len == 0 {
            return Err(ProxiError::Config("window_len must be positive".into()));
        }
        if self.model_window == 0 || self.model_window > self.window_len {
            return Err(ProxiError::Config(format!(
                "model_window must be in 1..={}, got {}",
                self.window_len, self.model_window
            )));
        }
        if !(0.0..1.0).contains(&self.decision_ratio) {
            return Err(ProxiError::Config(format!(
                "decision_ratio must be in [0, 1), got {}",
                self.decision_ratio
            )));
        }
        if self.saturation.is_nan() || self.score_threshold.is_nan() {
            return Err(ProxiError::Config("thresholds must not be NaN".into()));
        }
        Ok(())
    }
}
