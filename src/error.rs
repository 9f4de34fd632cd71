//! # Error Types
//!
//! This module defines error types used throughout the carteirinha library.
//!
//! Every variant is recoverable: the caller reports it and the user retries.

use thiserror::Error;

/// Main error type for carteirinha operations
#[derive(Debug, Error)]
pub enum CarteirinhaError {
    /// Malformed user input (missing name, oversized file, bad MIME type)
    #[error("{0}")]
    Validation(String),

    /// A field rule would be broken; refused before any mutation
    #[error("{0}")]
    Invariant(String),

    /// Background image or photo could not be fetched or decoded
    #[error("Failed to load image: {0}")]
    ResourceLoad(String),

    /// Persistence or storage collaborator failure
    #[error("Backend error: {0}")]
    Backend(String),

    /// Requested template, field or image does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Export of the back side was requested but the template has no back image
    #[error("Template has no back image; the back side cannot be exported")]
    MissingBackImage,

    /// Image encoding error
    #[error("Image error: {0}")]
    Image(String),

    /// I/O error wrapper
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T, E = CarteirinhaError> = std::result::Result<T, E>;
