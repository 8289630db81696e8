//! Pipeline Error Types

use acquisition::AcquisitionError;
use command_link::LinkError;
use inference_engine::InferenceError;
use ring_buffer::QueueError;
use thiserror::Error;

/// Errors that stop the pipeline from starting
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Configuration sources could not be read or deserialized
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// Configuration values are inconsistent
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Standalone window does not match the classifier input size
    #[error(
        "The size of the feature window is not correct. Expected {expected} items, but had {actual}"
    )]
    FeatureSizeMismatch { expected: usize, actual: usize },

    #[error(transparent)]
    Inference(#[from] InferenceError),

    #[error(transparent)]
    Acquisition(#[from] AcquisitionError),

    #[error(transparent)]
    Link(#[from] LinkError),

    #[error(transparent)]
    Queue(#[from] QueueError),

    /// Worker thread could not be spawned
    #[error("Failed to start {name} thread: {reason}")]
    Thread { name: &'static str, reason: String },

    /// Global subscriber already installed
    #[error("Logging setup failed: {0}")]
    Logging(String),
}
