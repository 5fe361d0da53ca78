//! Streaming classifier.
//!
//! Raw readings are saturated and averaged over a FIFO window. Once that
//! window is full, every new reading triggers one inference over the most
//! recent smoothed values. The thresholded model output is itself averaged
//! over a second FIFO window to produce the reported decision, and falling
//! edges (true -> false) of that decision are counted.

use serde::{Deserialize, Serialize};

use crate::config::ClassifierConfig;
use crate::error::{ProxiError, Result};
use crate::inference::{quantize, InferenceEngine};
use crate::window::FifoWindow;

/// Result of ingesting one reading.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Step {
    /// Mean of the raw window after this reading.
    pub smoothed_input: f64,
    /// Smoothed decision; `None` until the raw window has filled.
    pub decision: Option<bool>,
    /// Model score behind this step, if the model ran.
    pub score: Option<f32>,
    /// Thresholded score before smoothing.
    pub raw_bit: Option<bool>,
}

/// Snapshot of the classifier's externally visible state.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassifierState {
    pub samples_seen: u64,
    pub warmed_up: bool,
    pub decision: Option<bool>,
    pub edge_count: u64,
    /// Sample at which inference failed, if the stream is halted.
    pub halted_at: Option<u64>,
}

pub struct StreamingClassifier<E> {
    engine: E,
    config: ClassifierConfig,
    raw: FifoWindow<f64>,
    /// Recent smoothed samples; the model reads the last `model_window`.
    smoothed: FifoWindow<f64>,
    /// Thresholded model outputs, 0 placeholders during warm-up.
    predictions: FifoWindow<u8>,
    previous: bool,
    last_decision: Option<bool>,
    edge_count: u64,
    samples_seen: u64,
    halted_at: Option<u64>,
}

impl<E: InferenceEngine> StreamingClassifier<E> {
    pub fn new(engine: E, config: ClassifierConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            engine,
            raw: FifoWindow::new(config.window_len),
            smoothed: FifoWindow::new(config.model_window),
            predictions: FifoWindow::new(config.window_len),
            config,
            previous: false,
            last_decision: None,
            edge_count: 0,
            samples_seen: 0,
            halted_at: None,
        })
    }

    /// Feeds one raw reading through the pipeline.
    ///
    /// Non-finite readings are rejected without touching any state. An engine
    /// failure leaves the raw window one reading ahead of the prediction
    /// window, so it halts the stream: every later call returns
    /// [`ProxiError::Halted`] until [`reset`](Self::reset).
    pub fn ingest(&mut self, raw_value: f64) -> Result<Step> {
        if let Some(at) = self.halted_at {
            return Err(ProxiError::Halted { at });
        }
        if !raw_value.is_finite() {
            return Err(ProxiError::InvalidSample(raw_value));
        }

        let value = raw_value.min(self.config.saturation);
        self.raw.push(value);
        self.samples_seen += 1;

        let smoothed_input = self.raw.mean();
        self.smoothed.push(smoothed_input);

        if !self.raw.is_full() {
            self.predictions.push(0);
            return Ok(Step {
                smoothed_input,
                decision: None,
                score: None,
                raw_bit: None,
            });
        }

        let input: Vec<u8> = self
            .smoothed
            .latest(self.config.model_window)
            .map(|&v| quantize(v))
            .collect();
        let score = match self.score(&input) {
            Ok(score) => score,
            Err(e) => {
                self.halted_at = Some(self.samples_seen);
                log::warn!("stream halted at sample {}: {}", self.samples_seen, e);
                return Err(e);
            }
        };

        let raw_bit = score < self.config.score_threshold;
        self.predictions.push(u8::from(raw_bit));

        let decision = self.predictions.mean() > self.config.decision_ratio;
        if self.previous && !decision {
            self.edge_count += 1;
            log::debug!(
                "falling edge at sample {} (count {})",
                self.samples_seen,
                self.edge_count
            );
        }
        self.previous = decision;
        self.last_decision = Some(decision);

        Ok(Step {
            smoothed_input,
            decision: Some(decision),
            score: Some(score),
            raw_bit: Some(raw_bit),
        })
    }

    fn score(&self, input: &[u8]) -> Result<f32> {
        let output = self.engine.infer(input)?;
        output.first().copied().ok_or(ProxiError::EmptyOutput)
    }

    /// Number of true -> false transitions of the decision so far.
    pub fn edge_count(&self) -> u64 {
        self.edge_count
    }

    pub fn is_warmed_up(&self) -> bool {
        self.raw.is_full()
    }

    pub fn samples_seen(&self) -> u64 {
        self.samples_seen
    }

    pub fn last_decision(&self) -> Option<bool> {
        self.last_decision
    }

    pub fn is_halted(&self) -> bool {
        self.halted_at.is_some()
    }

    pub fn state(&self) -> ClassifierState {
        ClassifierState {
            samples_seen: self.samples_seen,
            warmed_up: self.is_warmed_up(),
            decision: self.last_decision,
            edge_count: self.edge_count,
            halted_at: self.halted_at,
        }
    }

    /// Drops all buffered readings and counters and clears a halt; the engine
    /// is kept.
    pub fn reset(&mut self) {
        self.raw.clear();
        self.smoothed.clear();
        self.predictions.clear();
        self.previous = false;
        self.last_decision = None;
        self.edge_count = 0;
        self.samples_seen = 0;
        self.halted_at = None;
    }

    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    #[cfg(test)]
    fn window_lens(&self) -> (usize, usize) {
        (self.raw.len(), self.predictions.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::ConstantEngine;

    fn classifier(score: f32) -> StreamingClassifier<ConstantEngine> {
        StreamingClassifier::new(ConstantEngine::new(score), ClassifierConfig::default()).unwrap()
    }

    #[test]
    fn test_saturates_above_limit() {
        let mut c = classifier(0.0);
        let step = c.ingest(250.0).unwrap();
        assert_eq!(step.smoothed_input, 100.0);
        // No lower clamp
        let step = c.ingest(-100.0).unwrap();
        assert_eq!(step.smoothed_input, 0.0);
    }

    #[test]
    fn test_windows_stay_bounded() {
        let mut c = classifier(0.0);
        for i in 0..100 {
            c.ingest(i as f64).unwrap();
            let (raw, pred) = c.window_lens();
            assert!(raw <= 20 && pred <= 20);
        }
        assert_eq!(c.window_lens(), (20, 20));
    }

    #[test]
    fn test_non_finite_rejected_without_mutation() {
        let mut c = classifier(0.0);
        c.ingest(5.0).unwrap();
        let err = c.ingest(f64::NAN).unwrap_err();
        assert!(matches!(err, ProxiError::InvalidSample(_)));
        assert_eq!(c.samples_seen(), 1);
        assert_eq!(c.window_lens(), (1, 1));
    }

    #[test]
    fn test_reset_returns_to_warm_up() {
        let mut c = classifier(0.0);
        for _ in 0..40 {
            c.ingest(10.0).unwrap();
        }
        assert!(c.is_warmed_up());
        c.reset();
        assert!(!c.is_warmed_up());
        assert_eq!(c.state().samples_seen, 0);
        assert_eq!(c.ingest(10.0).unwrap().decision, None);
    }

    #[test]
    fn test_empty_output_halts() {
        struct Silent;
        impl InferenceEngine for Silent {
            fn infer(&self, _input: &[u8]) -> Result<Vec<f32>> {
                Ok(Vec::new())
            }
            fn describe(&self) -> String {
                "silent".to_string()
            }
        }

        let mut c = StreamingClassifier::new(Silent, ClassifierConfig::default()).unwrap();
        for _ in 0..19 {
            c.ingest(1.0).unwrap();
        }
        assert!(matches!(c.ingest(1.0), Err(ProxiError::EmptyOutput)));
        assert_eq!(c.state().halted_at, Some(20));
        assert!(matches!(c.ingest(1.0), Err(ProxiError::Halted { at: 20 })));
        assert_eq!(c.window_lens(), (20, 19));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let cfg = ClassifierConfig {
            window_len: 0,
            ..Default::default()
        };
        assert!(StreamingClassifier::new(ConstantEngine::new(0.0), cfg).is_err());
    }
}
