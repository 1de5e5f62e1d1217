//! Room document renderers.

use crate::error::RenderResult;
use crate::facilities::{default_facilities, split_facilities};
use crate::layout::DocumentLayout;
use crate::pdf::{JpegImage, write_document};
use lodge_core::Room;

/// Turns room records into printable documents.
pub trait RoomRenderer: Send + Sync {
    /// Render the detail sheet of one room, showing `image` when it is the
    /// content of the room's image in a format the renderer can embed.
    fn render_room(
        &self,
        room: &Room,
        image: Option<&[u8]>,
        generated_at: &str,
    ) -> RenderResult<Vec<u8>>;

    /// Render an overview of all rooms.
    fn render_room_list(&self, rooms: &[Room], generated_at: &str) -> RenderResult<Vec<u8>>;

    /// MIME type of the produced documents.
    fn content_type(&self) -> &'static str;
}

const ROOM_IMAGE_MAX_HEIGHT: f32 = 260.0;

/// Built-in PDF renderer.
pub struct PdfRenderer {
    brand: String,
    facilities: Vec<String>,
}

impl Default for PdfRenderer {
    fn default() -> Self {
        Self::new("Lodge")
    }
}

impl PdfRenderer {
    /// Create a renderer printing `brand` in document headers.
    pub fn new(brand: impl Into<String>) -> Self {
        Self {
            brand: brand.into(),
            facilities: default_facilities(),
        }
    }

    /// Replace the facility catalog.
    pub fn with_facilities(mut self, facilities: Vec<String>) -> Self {
        self.facilities = facilities;
        self
    }

    fn header(&self, layout: &mut DocumentLayout, title: &str) {
        layout.heading(&self.brand, 10.0);
        layout.heading(title, 20.0);
        layout.rule();
        layout.spacer(6.0);
    }
}

impl RoomRenderer for PdfRenderer {
    fn render_room(
        &self,
        room: &Room,
        image: Option<&[u8]>,
        generated_at: &str,
    ) -> RenderResult<Vec<u8>> {
        let mut layout = DocumentLayout::new();
        self.header(&mut layout, &room.name);

        let images: Vec<JpegImage> = image.and_then(JpegImage::parse).into_iter().collect();
        match images.first() {
            Some(photo) => {
                layout.image(0, photo, ROOM_IMAGE_MAX_HEIGHT);
                layout.spacer(12.0);
            }
            None if image.is_some() => {
                tracing::debug!(room_id = room.id, "Room image is not a JPEG, leaving it out");
            }
            None => {}
        }

        layout.paragraph(&room.description, 11.0);
        layout.spacer(12.0);

        let guests = if room.capacity == 1 { "guest" } else { "guests" };
        layout.label_value("Capacity", &format!("{} {guests}", room.capacity), 11.0);
        layout.label_value("Facilities", &room.facilities_count.to_string(), 11.0);
        if images.is_empty()
            && let Some(image_url) = &room.image_url
        {
            layout.label_value("Image", image_url, 11.0);
        }
        layout.label_value("Created", &room.created_at, 11.0);
        if let Some(updated_at) = &room.updated_at {
            layout.label_value("Updated", updated_at, 11.0);
        }

        layout.spacer(16.0);
        layout.heading("Facilities", 14.0);
        layout.spacer(4.0);
        let (left, right) = split_facilities(&self.facilities);
        layout.columns(left, right, 11.0);

        let pages = layout.finish(&format!("Generated on {generated_at}"));
        let bytes = write_document(&room.name, &pages, &images)?;
        tracing::debug!(
            room_id = room.id,
            pages = pages.len(),
            images = images.len(),
            size = bytes.len(),
            "Rendered room document"
        );
        Ok(bytes)
    }

    fn render_room_list(&self, rooms: &[Room], generated_at: &str) -> RenderResult<Vec<u8>> {
        let mut layout = DocumentLayout::new();
        self.header(&mut layout, "Rooms");
        layout.paragraph(&format!("{} rooms", rooms.len()), 10.0);
        layout.spacer(8.0);

        if rooms.is_empty() {
            layout.paragraph("No rooms have been created yet.", 11.0);
        }
        for room in rooms {
            layout.heading(&room.name, 13.0);
            layout.paragraph(&room.description, 10.0);
            layout.label_value("Capacity", &room.capacity.to_string(), 10.0);
            layout.label_value("Facilities", &room.facilities_count.to_string(), 10.0);
            layout.rule();
        }

        let pages = layout.finish(&format!("Generated on {generated_at}"));
        let bytes = write_document("Rooms", &pages, &[])?;
        tracing::debug!(
            rooms = rooms.len(),
            pages = pages.len(),
            size = bytes.len(),
            "Rendered room list document"
        );
        Ok(bytes)
    }

    fn content_type(&self) -> &'static str {
        "application/pdf"
    }
}
