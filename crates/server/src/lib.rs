//! HTTP API server for the Lodge hotel room backend.
//!
//! This crate provides:
//! - Room CRUD endpoints
//! - The image lifecycle (temp upload, finalize, cleanup, orphan sweep)
//! - Room and room-list PDF downloads
//! - Health and Prometheus endpoints

pub mod error;
pub mod handlers;
pub mod images;
pub mod metrics;
pub mod routes;
pub mod seed;
pub mod state;

pub use error::ApiError;
pub use images::ImageLifecycle;
pub use routes::create_router;
pub use state::AppState;
