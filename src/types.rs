//! Shared error and result types for Agora

use thiserror::Error;

/// The primary error type for Agora operations
#[derive(Error, Debug)]
pub enum AgoraError {
    /// Invalid or missing input from the caller (400)
    #[error("validation error: {0}")]
    Validation(String),

    /// Referenced record does not exist (404)
    #[error("{0} not found")]
    NotFound(String),

    /// Missing or invalid credentials (401)
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Authenticated but not permitted (403)
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Record store failure (500)
    #[error("database error: {0}")]
    Database(String),

    /// Ordered query failed for lack of an index; carries a remediation hint
    #[error("database index required: {0}")]
    IndexMissing(String),

    /// Blob store failure (500)
    #[error("storage error: {0}")]
    Storage(String),

    /// Malformed HTTP request (body too large, bad JSON, ...)
    #[error("http error: {0}")]
    Http(String),

    /// Anything else (500, message not exposed to callers)
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<std::io::Error> for AgoraError {
    fn from(e: std::io::Error) -> Self {
        AgoraError::Storage(e.to_string())
    }
}

/// Specialized Result for Agora operations
pub type Result<T> = std::result::Result<T, AgoraError>;
