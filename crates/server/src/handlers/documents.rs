//! PDF document handlers.

use crate::error::{ApiError, ApiResult};
use crate::handlers::rooms::parse_room_id;
use crate::metrics::record_document;
use crate::state::AppState;
use axum::extract::{Path, State};
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use lodge_core::Room;
use lodge_core::room::generation_stamp;
use lodge_render::RenderResult;
use time::OffsetDateTime;

/// File name offered for a room's document.
///
/// Spaces and non-ASCII characters become underscores; anything unsafe in a
/// file name or header is dropped.
pub fn room_document_name(room: &Room) -> String {
    let name = sanitize_filename::sanitize(room.name.replace(' ', "_"));
    let name: String = name
        .chars()
        .filter(|c| !matches!(c, '"' | '\\' | ';') && !c.is_control())
        .map(|c| if c.is_ascii() { c } else { '_' })
        .collect();
    format!("room_{}_{}.pdf", room.id, name)
}

fn attachment(content_type: &'static str, file_name: &str, bytes: Vec<u8>) -> ApiResult<Response> {
    let disposition = HeaderValue::from_str(&format!("attachment; filename=\"{file_name}\""))
        .map_err(|e| ApiError::Internal(format!("invalid file name header: {e}")))?;

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, HeaderValue::from_static(content_type)),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    )
        .into_response())
}

/// Run a render on the blocking pool; documents are built synchronously.
async fn render_blocking<F>(kind: &'static str, render: F) -> ApiResult<Vec<u8>>
where
    F: FnOnce() -> RenderResult<Vec<u8>> + Send + 'static,
{
    let result = tokio::task::spawn_blocking(render)
        .await
        .map_err(|e| ApiError::Internal(format!("render task failed: {e}")))?;
    record_document(kind, result.is_ok());

    Ok(result?)
}

/// POST /rooms/{room_id}/generate-pdf - Render one room.
pub async fn generate_room_pdf(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
) -> ApiResult<Response> {
    let room_id = parse_room_id(&room_id)?;
    let room: Room = state
        .metadata
        .get_room(room_id)
        .await?
        .ok_or(lodge_core::Error::RoomNotFound(room_id))?
        .into();

    let file_name = room_document_name(&room);
    let image = state.images.room_image(room.image_url.as_deref()).await;
    let generated_at = generation_stamp(OffsetDateTime::now_utc());
    let renderer = state.renderer.clone();
    let bytes = render_blocking("room", move || {
        renderer.render_room(&room, image.as_deref(), &generated_at)
    })
    .await?;

    tracing::info!(room_id, size = bytes.len(), "Generated room document");
    attachment(state.renderer.content_type(), &file_name, bytes)
}

/// POST /rooms/generate-pdf - Render the list of all rooms.
pub async fn generate_room_list_pdf(State(state): State<AppState>) -> ApiResult<Response> {
    let rooms: Vec<Room> = state
        .metadata
        .list_rooms()
        .await?
        .into_iter()
        .map(Room::from)
        .collect();

    let count = rooms.len();
    let generated_at = generation_stamp(OffsetDateTime::now_utc());
    let renderer = state.renderer.clone();
    let bytes =
        render_blocking("room_list", move || renderer.render_room_list(&rooms, &generated_at))
            .await?;

    tracing::info!(rooms = count, size = bytes.len(), "Generated room list document");
    attachment(state.renderer.content_type(), "rooms.pdf", bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn room(id: i64, name: &str) -> Room {
        Room {
            id,
            name: name.to_string(),
            description: String::new(),
            capacity: 2,
            facilities_count: 0,
            image_url: None,
            created_at: "01/01/25".to_string(),
            updated_at: None,
        }
    }

    #[test]
    fn document_name_replaces_spaces() {
        assert_eq!(
            room_document_name(&room(3, "King Junior Suite")),
            "room_3_King_Junior_Suite.pdf"
        );
    }

    #[test]
    fn document_name_drops_header_breaking_characters() {
        let name = room_document_name(&room(4, "a\"b/c;d\\e"));
        assert!(name.starts_with("room_4_"));
        assert!(name.ends_with(".pdf"));
        for c in ['"', '/', ';', '\\'] {
            assert!(!name.contains(c), "{name}");
        }
    }
}
