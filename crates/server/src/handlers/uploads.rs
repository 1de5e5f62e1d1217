//! Image upload handlers: temp upload, finalize, cleanup.

use crate::error::{ApiError, ApiResult};
use crate::handlers::rooms::read_json;
use crate::state::AppState;
use axum::Json;
use axum::extract::multipart::MultipartError;
use axum::extract::{Multipart, Request, State};
use axum::http::StatusCode;
use lodge_core::Room;
use serde::{Deserialize, Serialize};

/// Multipart field carrying the image.
const IMAGE_FIELD: &str = "image";

/// Maximum request body size for finalize and cleanup requests (64 KiB).
const MAX_CONTROL_BODY_SIZE: usize = 64 * 1024;

/// Response to a temp upload.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TempUploadResponse {
    pub success: bool,
    pub temp_image_url: String,
    pub file_name: String,
}

/// Finalize request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalizeRequest {
    pub room_id: i64,
    pub temp_image_url: String,
}

/// Response to a successful finalize.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalizeResponse {
    pub success: bool,
    pub image_url: String,
    pub room: Room,
}

/// Cleanup request. A missing reference is a no-op.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanupRequest {
    #[serde(default)]
    pub temp_image_url: Option<String>,
}

/// Response to a cleanup.
#[derive(Debug, Serialize)]
pub struct CleanupResponse {
    pub success: bool,
}

fn multipart_error(e: MultipartError) -> ApiError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge(e.body_text())
    } else {
        ApiError::BadRequest(format!("invalid multipart body: {}", e.body_text()))
    }
}

/// POST /upload/temp-room-image - Store an image in the temp area.
pub async fn upload_temp_image(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<Json<TempUploadResponse>> {
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(IMAGE_FIELD) {
            continue;
        }

        let original = sanitize_filename::sanitize(field.file_name().unwrap_or_default());
        let content_type = field.content_type().unwrap_or_default().to_string();
        let data = field.bytes().await.map_err(multipart_error)?;
        let max = state.images.config().max_upload_bytes;
        if data.len() > max {
            crate::metrics::record_upload_rejected("too_large");
            return Err(ApiError::PayloadTooLarge(format!(
                "image is {} bytes, limit is {max}",
                data.len()
            )));
        }

        let stored = state
            .images
            .store_temp(data, &content_type, &original)
            .await?;

        return Ok(Json(TempUploadResponse {
            success: true,
            temp_image_url: stored.url,
            file_name: stored.reference.file_name().to_string(),
        }));
    }

    Err(ApiError::BadRequest(format!(
        "missing multipart field: {IMAGE_FIELD}"
    )))
}

/// POST /upload/finalize-room-image - Attach a temp upload to a room.
pub async fn finalize_room_image(
    State(state): State<AppState>,
    req: Request,
) -> ApiResult<Json<FinalizeResponse>> {
    let request: FinalizeRequest = read_json(req, MAX_CONTROL_BODY_SIZE).await?;
    if request.temp_image_url.trim().is_empty() {
        return Err(ApiError::BadRequest("tempImageUrl is required".to_string()));
    }

    let done = state
        .images
        .finalize(request.room_id, &request.temp_image_url)
        .await?;

    Ok(Json(FinalizeResponse {
        success: true,
        image_url: done.url,
        room: done.room,
    }))
}

/// POST /upload/cleanup-temp-image - Discard an unfinalized upload.
pub async fn cleanup_temp_image(
    State(state): State<AppState>,
    req: Request,
) -> ApiResult<Json<CleanupResponse>> {
    let body = axum::body::to_bytes(req.into_body(), MAX_CONTROL_BODY_SIZE)
        .await
        .map_err(|e| ApiError::BadRequest(format!("failed to read body: {e}")))?;
    let request: CleanupRequest = if body.iter().all(u8::is_ascii_whitespace) {
        CleanupRequest::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| ApiError::BadRequest(format!("invalid JSON: {e}")))?
    };

    if let Some(reference) = request.temp_image_url.as_deref()
        && !reference.trim().is_empty()
    {
        state.images.cleanup(reference).await?;
    }

    Ok(Json(CleanupResponse { success: true }))
}
