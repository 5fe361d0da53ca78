use thiserror::Error;

/// Errors raised by the classifier and the inference engines.
#[derive(Debug, Error)]
pub enum ProxiError {
    /// The model input did not have the length the engine was built for.
    #[error("expected exactly {expected} input values, got {got}")]
    InputLength { expected: usize, got: usize },

    /// A raw reading that cannot be averaged (NaN or infinite).
    #[error("invalid sample: {0}")]
    InvalidSample(f64),

    #[error("model returned an empty output tensor")]
    EmptyOutput,

    #[error("inference failed: {0:#}")]
    Inference(#[from] anyhow::Error),

    #[error("invalid configuration: {0}")]
    Config(String),

    /// An earlier inference failed part way through a reading; the stream
    /// refuses input until it is reset.
    #[error("stream halted after inference failure at sample {at}; reset to continue")]
    Halted { at: u64 },
}

impl ProxiError {
    /// True for errors caused by the caller's input rather than the engine.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            ProxiError::InputLength { .. } | ProxiError::InvalidSample(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, ProxiError>;
