//! Object storage abstraction and backends for the image areas.
//!
//! This crate provides:
//! - A flat object store trait with atomic writes and atomic renames
//! - The local filesystem backend
//! - Construction of the temp and permanent image areas from configuration

pub mod backends;
pub mod error;
pub mod traits;

pub use backends::filesystem::FilesystemBackend;
pub use error::{StorageError, StorageResult};
pub use traits::{ObjectStore, is_hidden_key};

use lodge_core::config::ImagesConfig;
use std::sync::Arc;

/// The two image areas.
#[derive(Clone)]
pub struct ImageAreas {
    /// Uploads waiting to be finalized or cleaned up.
    pub temp: Arc<dyn ObjectStore>,
    /// Images attached to rooms.
    pub permanent: Arc<dyn ObjectStore>,
}

/// Create both image areas from configuration.
pub async fn from_config(config: &ImagesConfig) -> StorageResult<ImageAreas> {
    config.validate().map_err(StorageError::Config)?;

    let temp = FilesystemBackend::new(&config.temp_dir).await?;
    let permanent = FilesystemBackend::new(&config.permanent_dir).await?;
    tracing::info!(
        backend = temp.backend_name(),
        temp_dir = %config.temp_dir.display(),
        permanent_dir = %config.permanent_dir.display(),
        "Image areas ready"
    );

    Ok(ImageAreas {
        temp: Arc::new(temp),
        permanent: Arc::new(permanent),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use tempfile::tempdir;

    #[tokio::test]
    async fn from_config_creates_both_areas() {
        let temp = tempdir().unwrap();
        let config = ImagesConfig {
            temp_dir: temp.path().join("temp"),
            permanent_dir: temp.path().join("permanent"),
            ..ImagesConfig::default()
        };

        let areas = from_config(&config).await.unwrap();
        areas
            .temp
            .put("hello.txt", Bytes::from_static(b"hi"))
            .await
            .unwrap();
        assert!(areas.temp.exists("hello.txt").await.unwrap());
        assert!(!areas.permanent.exists("hello.txt").await.unwrap());
        assert!(config.permanent_dir.is_dir());
    }

    #[tokio::test]
    async fn from_config_rejects_shared_directory() {
        let temp = tempdir().unwrap();
        let config = ImagesConfig {
            temp_dir: temp.path().to_path_buf(),
            permanent_dir: temp.path().to_path_buf(),
            ..ImagesConfig::default()
        };

        match from_config(&config).await {
            Ok(_) => panic!("expected error"),
            Err(StorageError::Config(_)) => {}
            Err(other) => panic!("unexpected error: {other:?}"),
        }
    }
}
