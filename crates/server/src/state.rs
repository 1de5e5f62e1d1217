//! Application state shared across handlers.

use crate::images::ImageLifecycle;
use lodge_core::config::AppConfig;
use lodge_metadata::MetadataStore;
use lodge_render::RoomRenderer;
use lodge_storage::ImageAreas;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::{OwnedRwLockReadGuard, OwnedRwLockWriteGuard, RwLock};

/// Keyed read/write lock over single rooms.
///
/// Shared holders of one room run concurrently; an exclusive holder runs
/// alone. Entries are created on first use and dropped again once no caller
/// holds or waits for them, so the map only ever contains rooms with work in
/// flight.
#[derive(Default)]
pub struct RoomLocks {
    locks: Mutex<HashMap<i64, Arc<RwLock<()>>>>,
}

impl RoomLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn entry(&self, room_id: i64) -> Arc<RwLock<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        locks.entry(room_id).or_default().clone()
    }

    /// Wait for exclusive access to `room_id`.
    pub async fn acquire(&self, room_id: i64) -> RoomGuard<'_> {
        let held = Held::Exclusive {
            _guard: self.entry(room_id).write_owned().await,
        };
        RoomGuard {
            locks: self,
            room_id,
            held: Some(held),
        }
    }

    /// Wait for shared access to `room_id`.
    pub async fn share(&self, room_id: i64) -> RoomGuard<'_> {
        let held = Held::Shared {
            _guard: self.entry(room_id).read_owned().await,
        };
        RoomGuard {
            locks: self,
            room_id,
            held: Some(held),
        }
    }

    /// Number of rooms with a holder or waiter.
    pub fn in_flight(&self) -> usize {
        self.locks.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

enum Held {
    Exclusive { _guard: OwnedRwLockWriteGuard<()> },
    Shared { _guard: OwnedRwLockReadGuard<()> },
}

/// Access to one room, released on drop.
pub struct RoomGuard<'a> {
    locks: &'a RoomLocks,
    room_id: i64,
    held: Option<Held>,
}

impl Drop for RoomGuard<'_> {
    fn drop(&mut self) {
        // Release before inspecting the entry so our own Arc is not counted.
        drop(self.held.take());

        let mut locks = self.locks.locks.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(lock) = locks.get(&self.room_id)
            && Arc::strong_count(lock) == 1
        {
            locks.remove(&self.room_id);
        }
    }
}

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Arc<AppConfig>,
    /// Room store.
    pub metadata: Arc<dyn MetadataStore>,
    /// Image lifecycle controller.
    pub images: Arc<ImageLifecycle>,
    /// Document renderer.
    pub renderer: Arc<dyn RoomRenderer>,
}

impl AppState {
    /// Create a new application state.
    pub fn new(
        config: AppConfig,
        areas: ImageAreas,
        metadata: Arc<dyn MetadataStore>,
        renderer: Arc<dyn RoomRenderer>,
    ) -> Self {
        let images = ImageLifecycle::new(
            config.images.clone(),
            areas.temp,
            areas.permanent,
            metadata.clone(),
        );

        Self {
            config: Arc::new(config),
            metadata,
            images: Arc::new(images),
            renderer,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn room_locks_serialize_same_room() {
        let locks = Arc::new(RoomLocks::new());
        let guard = locks.acquire(1).await;

        let waiter = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let _guard = locks.acquire(1).await;
            })
        };

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!waiter.is_finished());
        assert_eq!(locks.in_flight(), 1);

        drop(guard);
        tokio::time::timeout(Duration::from_secs(2), waiter)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(locks.in_flight(), 0);
    }

    #[tokio::test]
    async fn room_locks_allow_different_rooms() {
        let locks = RoomLocks::new();
        let first = locks.acquire(1).await;
        let second = tokio::time::timeout(Duration::from_secs(1), locks.acquire(2))
            .await
            .unwrap();
        assert_eq!(locks.in_flight(), 2);

        drop(first);
        drop(second);
        assert_eq!(locks.in_flight(), 0);
    }

    #[tokio::test]
    async fn shared_holders_run_together_but_exclude_acquire() {
        let locks = Arc::new(RoomLocks::new());
        let first = locks.share(1).await;
        let second = tokio::time::timeout(Duration::from_secs(1), locks.share(1))
            .await
            .unwrap();

        let exclusive = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let _guard = locks.acquire(1).await;
            })
        };

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!exclusive.is_finished());

        drop(first);
        drop(second);
        tokio::time::timeout(Duration::from_secs(2), exclusive)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(locks.in_flight(), 0);
    }
}
