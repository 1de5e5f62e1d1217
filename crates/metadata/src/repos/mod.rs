//! Repository traits for metadata operations.

pub mod rooms;

pub use rooms::RoomRepo;
