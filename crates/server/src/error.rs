//! API error types.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

/// API error response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Always `false`, mirroring the `success` flag of successful responses.
    pub success: bool,
    /// Error code for programmatic handling.
    pub code: String,
    /// Human-readable error message.
    pub message: String,
}

/// API error type.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("payload too large: {0}")]
    PayloadTooLarge(String),

    #[error("internal error: {0}")]
    Internal(String),

    #[error("storage error: {0}")]
    Storage(#[from] lodge_storage::StorageError),

    #[error("metadata error: {0}")]
    Metadata(#[from] lodge_metadata::MetadataError),

    #[error("render error: {0}")]
    Render(#[from] lodge_render::RenderError),

    #[error("{0}")]
    Core(#[from] lodge_core::Error),
}

impl ApiError {
    /// Get the error code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "bad_request",
            Self::PayloadTooLarge(_) => "payload_too_large",
            Self::Internal(_) => "internal_error",
            Self::Storage(_) => "storage_error",
            Self::Metadata(lodge_metadata::MetadataError::Constraint(_)) => "validation_error",
            Self::Metadata(_) => "metadata_error",
            Self::Render(_) => "render_failed",
            Self::Core(e) => match e {
                lodge_core::Error::InvalidMediaType(_) => "invalid_media_type",
                lodge_core::Error::RoomNotFound(_) => "room_not_found",
                lodge_core::Error::TempAssetMissing(_) => "temp_asset_missing",
                lodge_core::Error::RenderFailed(_) => "render_failed",
                lodge_core::Error::StorageIo(_) => "storage_error",
                lodge_core::Error::Validation(_) => "validation_error",
            },
        }
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Storage(e) => match e {
                lodge_storage::StorageError::NotFound(_) => StatusCode::NOT_FOUND,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Metadata(e) => match e {
                lodge_metadata::MetadataError::Constraint(_) => StatusCode::BAD_REQUEST,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Render(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Core(e) => match e {
                lodge_core::Error::InvalidMediaType(_) | lodge_core::Error::Validation(_) => {
                    StatusCode::BAD_REQUEST
                }
                lodge_core::Error::RoomNotFound(_) | lodge_core::Error::TempAssetMissing(_) => {
                    StatusCode::NOT_FOUND
                }
                lodge_core::Error::RenderFailed(_) | lodge_core::Error::StorageIo(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(code = self.code(), error = %self, "Request failed");
        }
        let body = ErrorResponse {
            success: false,
            code: self.code().to_string(),
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

/// Result type for API handlers.
pub type ApiResult<T> = std::result::Result<T, ApiError>;
