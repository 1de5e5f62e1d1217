//! Core domain types and shared logic for the lodge room service.
//!
//! This crate defines the data model used across all other crates:
//! - Room records and their field rules
//! - Temp and permanent image references and their naming
//! - The per-upload state machine
//! - Configuration

pub mod config;
pub mod error;
pub mod image;
pub mod room;

pub use error::{Error, Result};
pub use image::{ImageUploadState, PermanentImageRef, TempImageRef};
pub use room::{NewRoom, Room, RoomPatch};
