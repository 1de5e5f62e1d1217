//! Database models mapping to the room schema.

use lodge_core::Room;
use sqlx::FromRow;

/// Room record.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct RoomRow {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub capacity: i64,
    pub facilities_count: i64,
    pub image_url: Option<String>,
    pub created_at: String,
    pub updated_at: Option<String>,
}

impl From<RoomRow> for Room {
    fn from(row: RoomRow) -> Self {
        Room {
            id: row.id,
            name: row.name,
            description: row.description,
            capacity: row.capacity,
            facilities_count: row.facilities_count,
            image_url: row.image_url,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Fields of a room about to be inserted. The store assigns the id.
#[derive(Debug, Clone)]
pub struct NewRoomRow {
    pub name: String,
    pub description: String,
    pub capacity: i64,
    pub facilities_count: i64,
    pub created_at: String,
    pub updated_at: Option<String>,
}
