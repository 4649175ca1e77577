//! Error types for auricle-sink
//!
//! Defines module-specific error types using thiserror for clear error propagation.

use thiserror::Error;

/// Main error type for the auricle-sink module
#[derive(Error, Debug)]
pub enum Error {
    /// Errors propagated from the shared library
    #[error(transparent)]
    Common(#[from] auricle_common::Error),

    /// Stream format the output device cannot be configured for
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Output device errors
    #[error("Audio output error: {0}")]
    Output(String),

    /// Invalid state for operation
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Other errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Convenience Result type using auricle-sink Error
pub type Result<T> = std::result::Result<T, Error>;
