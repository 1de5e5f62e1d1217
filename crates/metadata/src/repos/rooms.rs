//! Room repository trait.

use crate::error::MetadataResult;
use crate::models::{NewRoomRow, RoomRow};
use async_trait::async_trait;
use lodge_core::RoomPatch;

/// Repository for room records.
#[async_trait]
pub trait RoomRepo: Send + Sync {
    /// Insert a room and return it with its assigned id.
    async fn create_room(&self, room: &NewRoomRow) -> MetadataResult<RoomRow>;

    /// Get a room by id.
    async fn get_room(&self, id: i64) -> MetadataResult<Option<RoomRow>>;

    /// List all rooms ordered by id.
    async fn list_rooms(&self) -> MetadataResult<Vec<RoomRow>>;

    /// Apply a partial update. Returns `None` when the room does not exist.
    async fn update_room(
        &self,
        id: i64,
        patch: &RoomPatch,
        updated_at: &str,
    ) -> MetadataResult<Option<RoomRow>>;

    /// Point a room at a permanent image.
    ///
    /// This is the only write path for `image_url`. `updated_at` is kept
    /// as stored when `None`. Returns `None` when the room does not exist.
    async fn set_room_image(
        &self,
        id: i64,
        image_url: &str,
        updated_at: Option<&str>,
    ) -> MetadataResult<Option<RoomRow>>;

    /// Delete a room. Returns whether a row was removed.
    async fn delete_room(&self, id: i64) -> MetadataResult<bool>;

    /// Count rooms.
    async fn count_rooms(&self) -> MetadataResult<i64>;

    /// All image URLs currently referenced by a room.
    async fn list_image_urls(&self) -> MetadataResult<Vec<String>>;
}
