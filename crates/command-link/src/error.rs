//! Command Link Error Types

use thiserror::Error;

/// Errors that can occur on the serial command link
#[derive(Debug, Error)]
pub enum LinkError {
    /// Serial port could not be opened or configured
    #[error("Serial port error: {0}")]
    SerialError(String),

    /// Read from the byte source failed
    #[error("Read failed: {0}")]
    ReadFailed(String),

    /// Runtime for the reader thread could not be started
    #[error("Reader runtime error: {0}")]
    Runtime(String),
}

impl From<std::io::Error> for LinkError {
    fn from(err: std::io::Error) -> Self {
        LinkError::ReadFailed(err.to_string())
    }
}

impl From<tokio_serial::Error> for LinkError {
    fn from(err: tokio_serial::Error) -> Self {
        LinkError::SerialError(err.to_string())
    }
}
