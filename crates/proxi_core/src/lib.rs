//! Sliding-window preprocessing and decision smoothing around a binary
//! time-series classifier.
//!
//! [`StreamingClassifier`] is shared by the HTTP service and the offline
//! replay tool; the model itself sits behind [`InferenceEngine`].

pub mod classifier;
pub mod config;
pub mod error;
pub mod inference;
pub mod window;

pub use classifier::{ClassifierState, Step, StreamingClassifier};
pub use config::ClassifierConfig;
pub use error::{ProxiError, Result};
pub use inference::{
    predict_raw, quantize, ConstantEngine, InferenceEngine, InputType, OnnxEngine, SharedEngine,
};
pub use window::FifoWindow;
