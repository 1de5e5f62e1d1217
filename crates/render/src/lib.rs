//! Room document rendering.
//!
//! This crate provides:
//! - The `RoomRenderer` seam used by the API layer
//! - A built-in PDF renderer with text wrapping and page numbering
//! - The default facility catalog and its two-column split

pub mod error;
pub mod facilities;
pub mod layout;
pub mod pdf;
pub mod renderer;

pub use error::{RenderError, RenderResult};
pub use facilities::{DEFAULT_FACILITIES, default_facilities, split_facilities};
pub use renderer::{PdfRenderer, RoomRenderer};
