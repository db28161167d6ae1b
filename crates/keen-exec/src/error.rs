//! Error types for keen-exec

use thiserror::Error;

/// Process subsystem error type
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid input
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The OS refused to start the process
    #[error("spawn failed: {0}")]
    Spawn(String),

    /// A signal could not be delivered
    #[error("signal failed: {0}")]
    Signal(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
