//! Sample Acquisition
//!
//! Pulls fixed-size batches from a sample source on every tick and offers
//! them to the sample queue without ever blocking. When the queue fills up
//! the rest of the batch is dropped: the sensor keeps advancing, so late
//! samples would be stale.

mod sampler;
mod source;

pub use sampler::{AcquisitionLoop, BatchOutcome};
pub use source::{
    load_replay, parse_replay, ReplaySource, SampleSource, SourceConfig, SourceKind,
    SyntheticSensor,
};

use thiserror::Error;

/// Errors when building a sample source
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AcquisitionError {
    #[error("Replay buffer is empty")]
    EmptyReplay,
    #[error("Invalid sample {value:?} on line {line}")]
    InvalidSample { line: usize, value: String },
    #[error("Replay file error: {0}")]
    Io(String),
    #[error("Replay source selected but no replay path configured")]
    MissingReplayPath,
}

impl From<std::io::Error> for AcquisitionError {
    fn from(err: std::io::Error) -> Self {
        AcquisitionError::Io(err.to_string())
    }
}
