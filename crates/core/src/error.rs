//! Error types for the core domain.

use thiserror::Error;

/// Core domain error type.
///
/// These are the failure conditions of the image lifecycle and room rules;
/// the server maps each to an HTTP status.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid media type: {0} (only image uploads are accepted)")]
    InvalidMediaType(String),

    #[error("room {0} not found")]
    RoomNotFound(i64),

    #[error("temporary image not found: {0}")]
    TempAssetMissing(String),

    #[error("document rendering failed: {0}")]
    RenderFailed(String),

    #[error("storage I/O error: {0}")]
    StorageIo(String),

    #[error("validation error: {0}")]
    Validation(String),
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, Error>;
