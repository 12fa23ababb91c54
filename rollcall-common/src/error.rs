//! Common error types for Rollcall

use thiserror::Error;

/// Common result type for Rollcall operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types shared by the dashboard library and CLI
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Persisted token could not be read or written
    #[error("Token store error: {0}")]
    TokenStore(String),

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}
