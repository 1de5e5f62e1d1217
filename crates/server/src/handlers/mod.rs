//! HTTP request handlers.

pub mod admin;
pub mod documents;
pub mod rooms;
pub mod uploads;

pub use admin::*;
pub use documents::*;
pub use rooms::*;
pub use uploads::*;
