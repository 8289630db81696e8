//! Windowed Inference Engine
//!
//! Runs a pull-based classifier once per window of raw samples. The
//! classifier itself is a collaborator behind the [`Classifier`] trait; this
//! crate supplies the data it pulls ([`FeedAdapter`], [`StaticSignal`]) and
//! the task loop that publishes its results ([`InferenceTask`]).

mod engine;
mod signal;
mod task;

pub use engine::{
    ensure_window, Classification, Classifier, InferenceResult, ModelInfo, ThresholdClassifier,
    Timing,
};
pub use signal::{BlockingSource, FeedAdapter, Signal, StaticSignal};
pub use task::{InferenceTask, WindowOutcome};

use thiserror::Error;

/// Errors during inference
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InferenceError {
    /// Classifier returned a non-zero status
    #[error("Classifier failed with status {code}")]
    EngineFailure { code: i32 },
    /// Read outside the window, or not at the next unread position
    #[error("Invalid read of {length} samples at offset {offset} in window of {window}")]
    InvalidRead {
        offset: usize,
        length: usize,
        window: usize,
    },
    /// Classifier was built for a different window length
    #[error("Window size mismatch: classifier expects {expected}, configured {actual}")]
    WindowSizeMismatch { expected: usize, actual: usize },
}

impl InferenceError {
    /// Status code reported for this error, zero meaning success elsewhere
    pub fn status_code(&self) -> i32 {
        match self {
            InferenceError::EngineFailure { code } => *code,
            InferenceError::InvalidRead { .. } => -1,
            InferenceError::WindowSizeMismatch { .. } => -2,
        }
    }
}
