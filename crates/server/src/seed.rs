//! Sample rooms for fresh installations.

use lodge_core::config::ImagesConfig;
use lodge_core::image::public_url;
use lodge_metadata::models::NewRoomRow;
use lodge_metadata::{MetadataResult, MetadataStore};
use lodge_storage::ObjectStore;

/// A sample room and the permanent image it ships with.
struct SampleRoom {
    name: &'static str,
    description: &'static str,
    capacity: i64,
    facilities_count: i64,
    image: &'static str,
    updated_at: Option<&'static str>,
}

/// Creation date stamped on every sample room.
const SAMPLE_CREATED_AT: &str = "17/03/25";

const SAMPLE_ROOMS: [SampleRoom; 4] = [
    SampleRoom {
        name: "The Apartment",
        description: "Two spacious bedrooms with kingsized beds, full bathroom, kitchen and \
                      living area set across two levels.",
        capacity: 4,
        facilities_count: 14,
        image: "theHugoHotelTheApartment.webp",
        updated_at: Some("18/03/25"),
    },
    SampleRoom {
        name: "Luxury Double Room",
        description: "Style and beauty with double bed, walk-in shower and daily servicing.",
        capacity: 2,
        facilities_count: 12,
        image: "theHugoHotelLuxuryDoubleRoomAlt.webp",
        updated_at: Some("18/03/25"),
    },
    SampleRoom {
        name: "Luxury Double Room",
        description: "Luxury and comfort with double bed, walk-in shower and daily servicing.",
        capacity: 2,
        facilities_count: 12,
        image: "theHugoHotelLuxuryDoubleRoom.webp",
        updated_at: None,
    },
    SampleRoom {
        name: "King Junior Suite",
        description: "Modern luxury with kingsized bed, walk-in shower, double sinks, sitting \
                      area and air conditioning.",
        capacity: 2,
        facilities_count: 12,
        image: "theHugoHotelKingJuniorSuite.webp",
        updated_at: None,
    },
];

/// Create the sample rooms when the store is empty.
///
/// A sample image is attached only if its file already exists in the
/// permanent area. Returns the number of rooms created.
pub async fn seed_sample_rooms(
    metadata: &dyn MetadataStore,
    permanent: &dyn ObjectStore,
    images: &ImagesConfig,
) -> MetadataResult<usize> {
    if metadata.count_rooms().await? > 0 {
        tracing::debug!("Room store is not empty, skipping sample data");
        return Ok(0);
    }

    for sample in &SAMPLE_ROOMS {
        let row = metadata
            .create_room(&NewRoomRow {
                name: sample.name.to_string(),
                description: sample.description.to_string(),
                capacity: sample.capacity,
                facilities_count: sample.facilities_count,
                created_at: SAMPLE_CREATED_AT.to_string(),
                updated_at: sample.updated_at.map(str::to_string),
            })
            .await?;

        match permanent.exists(sample.image).await {
            Ok(true) => {
                let url = public_url(&images.permanent_url_prefix, sample.image);
                metadata.set_room_image(row.id, &url, None).await?;
            }
            Ok(false) => {
                tracing::debug!(room_id = row.id, image = sample.image, "Sample image absent");
            }
            Err(e) => {
                tracing::warn!(room_id = row.id, image = sample.image, error = %e, "Failed to check sample image");
            }
        }
    }

    tracing::info!(rooms = SAMPLE_ROOMS.len(), "Seeded sample rooms");
    Ok(SAMPLE_ROOMS.len())
}
