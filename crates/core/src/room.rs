//! Room entity and request types.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use time::macros::format_description;

/// A hotel room.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    /// Store-assigned identifier.
    pub id: i64,
    pub name: String,
    pub description: String,
    /// Number of guests, always positive.
    pub capacity: i64,
    pub facilities_count: i64,
    /// Public URL of the room image in the permanent area.
    pub image_url: Option<String>,
    /// Date stamp assigned on creation (`dd/mm/yy`).
    pub created_at: String,
    /// Date stamp of the last modification (`dd/mm/yy`).
    pub updated_at: Option<String>,
}

/// Fields accepted when creating a room.
///
/// `image_url` is deliberately absent: only the image lifecycle sets it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewRoom {
    pub name: String,
    pub description: String,
    pub capacity: i64,
    #[serde(default)]
    pub facilities_count: i64,
}

impl NewRoom {
    /// Check field rules.
    pub fn validate(&self) -> Result<()> {
        validate_name(&self.name)?;
        validate_capacity(self.capacity)?;
        validate_facilities_count(self.facilities_count)
    }
}

/// A partial update. Absent fields are left unchanged.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomPatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub capacity: Option<i64>,
    #[serde(default)]
    pub facilities_count: Option<i64>,
}

impl RoomPatch {
    /// Check field rules on the supplied fields.
    pub fn validate(&self) -> Result<()> {
        if let Some(name) = &self.name {
            validate_name(name)?;
        }
        if let Some(capacity) = self.capacity {
            validate_capacity(capacity)?;
        }
        if let Some(count) = self.facilities_count {
            validate_facilities_count(count)?;
        }
        Ok(())
    }

    /// Whether the patch carries no field at all.
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.capacity.is_none()
            && self.facilities_count.is_none()
    }
}

fn validate_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(Error::Validation("name must not be empty".to_string()));
    }
    Ok(())
}

fn validate_capacity(capacity: i64) -> Result<()> {
    if capacity <= 0 {
        return Err(Error::Validation(format!(
            "capacity must be positive, got {capacity}"
        )));
    }
    Ok(())
}

fn validate_facilities_count(count: i64) -> Result<()> {
    if count < 0 {
        return Err(Error::Validation(format!(
            "facilities_count must not be negative, got {count}"
        )));
    }
    Ok(())
}

/// Format the `dd/mm/yy` stamp stored in `created_at` and `updated_at`.
pub fn date_stamp(at: OffsetDateTime) -> String {
    let format = format_description!("[day]/[month]/[year repr:last_two]");
    // Formatting a fixed component list into a String cannot fail.
    at.format(&format).unwrap_or_default()
}

/// Format the `dd/mm/YYYY, HH:MM:SS` stamp printed on generated documents.
pub fn generation_stamp(at: OffsetDateTime) -> String {
    let format = format_description!("[day]/[month]/[year], [hour]:[minute]:[second]");
    at.format(&format).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn new_room() -> NewRoom {
        NewRoom {
            name: "Luxury Double Room".to_string(),
            description: "Sea view".to_string(),
            capacity: 2,
            facilities_count: 12,
        }
    }

    #[test]
    fn test_new_room_validation() {
        assert!(new_room().validate().is_ok());

        let blank = NewRoom {
            name: "   ".to_string(),
            ..new_room()
        };
        assert!(matches!(blank.validate(), Err(Error::Validation(_))));

        let empty = NewRoom {
            capacity: 0,
            ..new_room()
        };
        assert!(matches!(empty.validate(), Err(Error::Validation(_))));

        let negative = NewRoom {
            facilities_count: -1,
            ..new_room()
        };
        assert!(matches!(negative.validate(), Err(Error::Validation(_))));
    }

    #[test]
    fn test_new_room_defaults_facilities_count() {
        let room: NewRoom =
            serde_json::from_str(r#"{"name":"A","description":"B","capacity":2}"#).unwrap();
        assert_eq!(room.facilities_count, 0);
    }

    #[test]
    fn test_new_room_ignores_image_url() {
        let room: NewRoom = serde_json::from_str(
            r#"{"name":"A","description":"B","capacity":2,"image_url":"/etc/passwd"}"#,
        )
        .unwrap();
        assert_eq!(room.name, "A");
    }

    #[test]
    fn test_patch_validation_only_checks_supplied_fields() {
        assert!(RoomPatch::default().validate().is_ok());
        assert!(RoomPatch::default().is_empty());

        let patch = RoomPatch {
            capacity: Some(-3),
            ..RoomPatch::default()
        };
        assert!(!patch.is_empty());
        assert!(matches!(patch.validate(), Err(Error::Validation(_))));
    }

    #[test]
    fn test_date_stamps() {
        let at = datetime!(2025-03-17 09:05:03 UTC);
        assert_eq!(date_stamp(at), "17/03/25");
        assert_eq!(generation_stamp(at), "17/03/2025, 09:05:03");
    }
}
