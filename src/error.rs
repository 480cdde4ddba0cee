//! Error types for the gaze tracking library.

use thiserror::Error;

/// Main error type for the library
#[derive(Error, Debug)]
pub enum Error {
    /// File I/O operation failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid input parameters provided
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Frame source failure (camera read, exhausted script, ...)
    #[error("Frame source error: {0}")]
    FrameSource(String),

    /// Landmark provider failure
    #[error("Landmark provider error: {0}")]
    LandmarkProvider(String),

    /// Model training error
    #[error("Training error: {0}")]
    Training(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Convenience type alias for Results with our Error type
pub type Result<T> = std::result::Result<T, Error>;
