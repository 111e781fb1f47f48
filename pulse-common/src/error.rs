//! Common error types for pulse services
//!
//! One taxonomy covers both validation and transport failures. HTTP status
//! and retryability are explicit properties of the error value so adapters
//! never have to infer them from the variant shape.

use thiserror::Error;

/// Common result type for pulse operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error taxonomy shared across the ingestion pipeline
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed or incomplete input. Never retried; the producer must
    /// resubmit corrected data.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Webhook signature mismatch. Never retried.
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Unknown campaign or data type. Never retried.
    #[error("Unsupported type: {0}")]
    UnsupportedType(String),

    /// Durable-store operation failed (wraps sqlx::Error). Retry policy
    /// belongs to the caller; the gateway does not retry internally.
    #[error("Store error: {0}")]
    Store(#[from] sqlx::Error),

    /// Store operation exceeded its bounded timeout
    #[error("Store operation timed out after {0}ms")]
    Timeout(u64),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error (corrupt stored state, serialization failure)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// HTTP status this error maps to at the gateway boundary
    pub fn http_status(&self) -> u16 {
        match self {
            Error::Validation(_) => 400,
            Error::Auth(_) => 401,
            Error::UnsupportedType(_) => 400,
            Error::Store(_) => 500,
            Error::Timeout(_) => 504,
            Error::Io(_) => 500,
            Error::Config(_) => 500,
            Error::Internal(_) => 500,
        }
    }

    /// Whether the producer may retry the same request unchanged
    pub fn retryable(&self) -> bool {
        matches!(self, Error::Store(_) | Error::Timeout(_) | Error::Io(_))
    }
}
