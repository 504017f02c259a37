//! Common error types for MarquePage

use thiserror::Error;

use crate::validation::FieldErrors;

/// Common result type for MarquePage operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error taxonomy shared by the repository and service layers
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Requested resource not found, or not owned by the caller
    #[error("Not found: {0}")]
    NotFound(String),

    /// One or more request fields failed validation
    #[error("Validation failed: {0}")]
    Validation(FieldErrors),

    /// Internal error (image processing, corrupt rows, ...)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Not-found error carrying the user-facing message
    pub fn not_found(what: &str) -> Self {
        Error::NotFound(format!("{} not found", what))
    }
}
