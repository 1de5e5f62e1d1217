//! Room CRUD handlers.

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use axum::Json;
use axum::extract::{Path, Request, State};
use axum::http::StatusCode;
use lodge_core::room::date_stamp;
use lodge_core::{NewRoom, Room, RoomPatch};
use lodge_metadata::models::NewRoomRow;
use time::OffsetDateTime;

/// Maximum request body size for room create/patch requests (64 KiB).
const MAX_ROOM_BODY_SIZE: usize = 64 * 1024;

/// Parse the `{room_id}` path segment.
pub(crate) fn parse_room_id(raw: &str) -> ApiResult<i64> {
    raw.parse::<i64>()
        .map_err(|_| ApiError::BadRequest(format!("invalid room id: {raw}")))
}

/// Read and deserialize a JSON request body.
pub(crate) async fn read_json<T: serde::de::DeserializeOwned>(
    req: Request,
    limit: usize,
) -> ApiResult<T> {
    let body = axum::body::to_bytes(req.into_body(), limit)
        .await
        .map_err(|e| ApiError::BadRequest(format!("failed to read body: {e}")))?;
    serde_json::from_slice(&body).map_err(|e| ApiError::BadRequest(format!("invalid JSON: {e}")))
}

async fn load_room(state: &AppState, room_id: i64) -> ApiResult<Room> {
    state
        .metadata
        .get_room(room_id)
        .await?
        .map(Room::from)
        .ok_or_else(|| lodge_core::Error::RoomNotFound(room_id).into())
}

/// GET /rooms - List all rooms.
pub async fn list_rooms(State(state): State<AppState>) -> ApiResult<Json<Vec<Room>>> {
    let rooms = state
        .metadata
        .list_rooms()
        .await?
        .into_iter()
        .map(Room::from)
        .collect();
    Ok(Json(rooms))
}

/// POST /rooms - Create a room.
pub async fn create_room(
    State(state): State<AppState>,
    req: Request,
) -> ApiResult<(StatusCode, Json<Room>)> {
    let new_room: NewRoom = read_json(req, MAX_ROOM_BODY_SIZE).await?;
    new_room.validate()?;

    let row = state
        .metadata
        .create_room(&NewRoomRow {
            name: new_room.name.trim().to_string(),
            description: new_room.description,
            capacity: new_room.capacity,
            facilities_count: new_room.facilities_count,
            created_at: date_stamp(OffsetDateTime::now_utc()),
            updated_at: None,
        })
        .await?;

    tracing::info!(room_id = row.id, name = %row.name, "Room created");
    Ok((StatusCode::CREATED, Json(row.into())))
}

/// GET /rooms/{room_id} - Get a room.
pub async fn get_room(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
) -> ApiResult<Json<Room>> {
    let room_id = parse_room_id(&room_id)?;
    Ok(Json(load_room(&state, room_id).await?))
}

/// PATCH /rooms/{room_id} - Update the supplied fields of a room.
pub async fn update_room(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
    req: Request,
) -> ApiResult<Json<Room>> {
    let room_id = parse_room_id(&room_id)?;
    let mut patch: RoomPatch = read_json(req, MAX_ROOM_BODY_SIZE).await?;
    patch.validate()?;

    if patch.is_empty() {
        return Ok(Json(load_room(&state, room_id).await?));
    }
    if let Some(name) = patch.name.as_mut() {
        *name = name.trim().to_string();
    }

    let row = state
        .metadata
        .update_room(room_id, &patch, &date_stamp(OffsetDateTime::now_utc()))
        .await?
        .ok_or(lodge_core::Error::RoomNotFound(room_id))?;

    tracing::info!(room_id, "Room updated");
    Ok(Json(row.into()))
}

/// DELETE /rooms/{room_id} - Delete a room.
///
/// The room's permanent image stays on disk until an orphan sweep.
pub async fn delete_room(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
) -> ApiResult<StatusCode> {
    let room_id = parse_room_id(&room_id)?;
    if !state.metadata.delete_room(room_id).await? {
        return Err(lodge_core::Error::RoomNotFound(room_id).into());
    }

    tracing::info!(room_id, "Room deleted");
    Ok(StatusCode::NO_CONTENT)
}
