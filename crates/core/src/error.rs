//! Error types for the core domain.

use thiserror::Error;

/// Core domain error type.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid submission: {0}")]
    Validation(String),

    #[error("invalid artifact key: {0}")]
    InvalidKey(String),
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, Error>;
