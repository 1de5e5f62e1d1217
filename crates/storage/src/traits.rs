//! Storage trait definitions.

use crate::error::StorageResult;
use async_trait::async_trait;
use bytes::Bytes;

/// Flat object store holding one image area.
///
/// Keys are plain file names. Keys starting with `.` are private to the
/// store's users (scratch and claim files) and are never listed.
#[async_trait]
pub trait ObjectStore: Send + Sync + 'static {
    /// Check if an object exists.
    async fn exists(&self, key: &str) -> StorageResult<bool>;

    /// Get an object's content.
    async fn get(&self, key: &str) -> StorageResult<Bytes>;

    /// Put an object atomically. Readers never observe a partial object.
    async fn put(&self, key: &str, data: Bytes) -> StorageResult<()>;

    /// Delete an object. Fails with `NotFound` when it does not exist.
    async fn delete(&self, key: &str) -> StorageResult<()>;

    /// Rename an object atomically within this store.
    ///
    /// Fails with `NotFound` when `from` does not exist. When several callers
    /// rename the same object concurrently, exactly one succeeds.
    async fn rename(&self, from: &str, to: &str) -> StorageResult<()>;

    /// List the visible keys of this store.
    async fn list(&self) -> StorageResult<Vec<String>>;

    /// List private keys starting with `prefix`, which must start with `.`.
    async fn list_private(&self, prefix: &str) -> StorageResult<Vec<String>>;

    /// Get the name of this storage backend.
    ///
    /// Returns a static string identifier for the backend type (e.g., "filesystem").
    /// Used for metrics and logging.
    fn backend_name(&self) -> &'static str;

    /// Verify the backend is usable.
    ///
    /// The default implementation returns Ok(()).
    async fn health_check(&self) -> StorageResult<()> {
        Ok(())
    }
}

/// Whether a key names a private object that listings skip.
pub fn is_hidden_key(key: &str) -> bool {
    key.starts_with('.')
}
