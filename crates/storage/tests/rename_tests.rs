// Concurrency tests for atomic rename, which the finalize claim relies on.

use bytes::Bytes;
use lodge_storage::{FilesystemBackend, ObjectStore, StorageError};
use std::sync::Arc;
use tempfile::TempDir;

#[tokio::test]
async fn test_concurrent_rename_has_single_winner() {
    let temp_dir = TempDir::new().unwrap();
    let backend = Arc::new(FilesystemBackend::new(temp_dir.path()).await.unwrap());
    backend
        .put("temp_1_0011aabb.jpg", Bytes::from_static(b"image"))
        .await
        .unwrap();

    let attempts = (0..8).map(|i| {
        let backend = backend.clone();
        tokio::spawn(async move {
            backend
                .rename("temp_1_0011aabb.jpg", &format!(".claim.{i}"))
                .await
        })
    });
    let results = futures::future::join_all(attempts).await;

    let mut winners = 0;
    for result in results {
        match result.unwrap() {
            Ok(()) => winners += 1,
            Err(StorageError::NotFound(_)) => {}
            Err(other) => panic!("unexpected error: {other:?}"),
        }
    }
    assert_eq!(winners, 1);
    assert!(backend.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_concurrent_puts_never_expose_partial_objects() {
    let temp_dir = TempDir::new().unwrap();
    let backend = Arc::new(FilesystemBackend::new(temp_dir.path()).await.unwrap());

    let payloads: Vec<Bytes> = (0..4u8).map(|i| Bytes::from(vec![i; 64 * 1024])).collect();
    let writers = payloads.iter().cloned().map(|data| {
        let backend = backend.clone();
        tokio::spawn(async move { backend.put("room_1_1.jpg", data).await })
    });
    for result in futures::future::join_all(writers).await {
        result.unwrap().unwrap();
    }

    let stored = backend.get("room_1_1.jpg").await.unwrap();
    assert!(payloads.contains(&stored));
    assert_eq!(backend.list().await.unwrap(), vec!["room_1_1.jpg"]);
}
