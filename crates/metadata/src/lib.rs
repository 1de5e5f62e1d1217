//! Room store abstraction and the SQLite implementation.
//!
//! This crate provides:
//! - Room records and the repository trait over them
//! - The single write path for room image references
//! - Queries backing the orphan sweep and sample-data seeding

pub mod error;
pub mod models;
pub mod repos;
pub mod store;

pub use error::{MetadataError, MetadataResult};
pub use store::{MetadataStore, SqliteStore};

use lodge_core::config::MetadataConfig;
use std::sync::Arc;

/// Create a metadata store from configuration.
pub async fn from_config(config: &MetadataConfig) -> MetadataResult<Arc<dyn MetadataStore>> {
    let store = SqliteStore::new(&config.path, config.busy_timeout_secs).await?;
    tracing::info!(path = %config.path.display(), "Connected to SQLite room store");
    Ok(Arc::new(store) as Arc<dyn MetadataStore>)
}
