//! Error types for the dashboard client
//!
//! Three failure families reach callers:
//! - `Unauthorized`: the session ended (token cleared, login shown). This is a
//!   cancellation, never an empty success.
//! - `Network`: transport failure, operation failed.
//! - `Api`: non-2xx answer with a human-readable message.

use thiserror::Error;

/// Dashboard client error type
#[derive(Debug, Error)]
pub enum ClientError {
    /// Server answered 401; the session has been cleared
    #[error("Session expired, please log in again")]
    Unauthorized,

    /// Request never completed (connect, timeout, body read)
    #[error("Network error: {0}")]
    Network(String),

    /// Non-2xx response
    #[error("{message}")]
    Api { status: u16, message: String },

    /// 2xx response whose body did not match the expected shape
    #[error("Unexpected response: {0}")]
    Parse(String),

    /// Rejected before sending
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// IO error (reading an upload)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// rollcall-common error
    #[error(transparent)]
    Common(#[from] rollcall_common::Error),
}

impl ClientError {
    /// True when the caller must stop because the session ended
    pub fn is_cancellation(&self) -> bool {
        matches!(self, ClientError::Unauthorized)
    }

    /// HTTP status, when the server produced one
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Api { status, .. } => Some(*status),
            ClientError::Unauthorized => Some(401),
            _ => None,
        }
    }
}
