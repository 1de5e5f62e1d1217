//! Metadata store test utilities.

use async_trait::async_trait;
use lodge_core::RoomPatch;
use lodge_metadata::models::{NewRoomRow, RoomRow};
use lodge_metadata::repos::RoomRepo;
use lodge_metadata::{MetadataError, MetadataResult, MetadataStore};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// A metadata store whose image writes can be made to fail.
/// Note: #[allow(dead_code)] because each test file compiles common/ separately.
#[allow(dead_code)]
pub struct FaultyMetadata {
    inner: Arc<dyn MetadataStore>,
    fail_image_writes: AtomicBool,
}

#[allow(dead_code)]
impl FaultyMetadata {
    pub fn new(inner: Arc<dyn MetadataStore>) -> Arc<Self> {
        Arc::new(Self {
            inner,
            fail_image_writes: AtomicBool::new(false),
        })
    }

    /// Make every following `set_room_image` fail.
    pub fn fail_image_writes(&self, fail: bool) {
        self.fail_image_writes.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl RoomRepo for FaultyMetadata {
    async fn create_room(&self, room: &NewRoomRow) -> MetadataResult<RoomRow> {
        self.inner.create_room(room).await
    }

    async fn get_room(&self, id: i64) -> MetadataResult<Option<RoomRow>> {
        self.inner.get_room(id).await
    }

    async fn list_rooms(&self) -> MetadataResult<Vec<RoomRow>> {
        self.inner.list_rooms().await
    }

    async fn update_room(
        &self,
        id: i64,
        patch: &RoomPatch,
        updated_at: &str,
    ) -> MetadataResult<Option<RoomRow>> {
        self.inner.update_room(id, patch, updated_at).await
    }

    async fn set_room_image(
        &self,
        id: i64,
        image_url: &str,
        updated_at: Option<&str>,
    ) -> MetadataResult<Option<RoomRow>> {
        if self.fail_image_writes.load(Ordering::SeqCst) {
            return Err(MetadataError::Io(std::io::Error::other(
                "injected: database unavailable",
            )));
        }
        self.inner.set_room_image(id, image_url, updated_at).await
    }

    async fn delete_room(&self, id: i64) -> MetadataResult<bool> {
        self.inner.delete_room(id).await
    }

    async fn count_rooms(&self) -> MetadataResult<i64> {
        self.inner.count_rooms().await
    }

    async fn list_image_urls(&self) -> MetadataResult<Vec<String>> {
        self.inner.list_image_urls().await
    }
}

#[async_trait]
impl MetadataStore for FaultyMetadata {
    async fn migrate(&self) -> MetadataResult<()> {
        self.inner.migrate().await
    }

    async fn health_check(&self) -> MetadataResult<()> {
        self.inner.health_check().await
    }
}
