//! Local filesystem storage backend.

use crate::error::{StorageError, StorageResult};
use crate::traits::{ObjectStore, is_hidden_key};
use async_trait::async_trait;
use bytes::Bytes;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::instrument;
use uuid::Uuid;

/// Local filesystem object store rooted at one directory.
pub struct FilesystemBackend {
    root: PathBuf,
}

impl FilesystemBackend {
    /// Create a new filesystem backend, creating the root directory if needed.
    pub async fn new(root: impl AsRef<Path>) -> StorageResult<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).await?;
        Ok(Self { root })
    }

    /// The directory backing this store.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Get the full path for a key, with path traversal protection.
    ///
    /// Keys must be a single normal path component. Existing entries that are
    /// symlinks are refused so that nothing outside the root is reachable.
    async fn key_path(&self, key: &str) -> StorageResult<PathBuf> {
        validate_key(key)?;
        let path = self.root.join(key);

        match fs::symlink_metadata(&path).await {
            Ok(meta) if meta.file_type().is_symlink() => Err(StorageError::InvalidKey(format!(
                "symlink escapes storage root: {key}"
            ))),
            Ok(_) => Ok(path),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(path),
            Err(err) => Err(StorageError::Io(std::io::Error::new(
                err.kind(),
                format!("failed to stat path: {err}"),
            ))),
        }
    }

    /// Sorted names of the regular files in the root accepted by `keep`.
    async fn file_names(&self, keep: impl Fn(&str) -> bool) -> StorageResult<Vec<String>> {
        let mut results = Vec::new();
        let mut entries = match fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(results),
            Err(e) => return Err(StorageError::Io(e)),
        };

        while let Some(entry) = entries.next_entry().await? {
            // file_type() does not follow symlinks; links and directories are skipped.
            let file_type = entry.file_type().await?;
            if !file_type.is_file() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str()
                && keep(name)
            {
                results.push(name.to_string());
            }
        }

        results.sort();
        Ok(results)
    }

    fn not_found(key: &str) -> impl FnOnce(std::io::Error) -> StorageError + '_ {
        move |e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                StorageError::NotFound(key.to_string())
            } else {
                StorageError::Io(e)
            }
        }
    }
}

fn validate_key(key: &str) -> StorageResult<()> {
    if key.is_empty() || key == "." || key == ".." {
        return Err(StorageError::InvalidKey(format!("invalid key: {key:?}")));
    }
    if key.contains(['/', '\\', '\0']) {
        return Err(StorageError::InvalidKey(format!(
            "path traversal not allowed: {key}"
        )));
    }
    Ok(())
}

#[async_trait]
impl ObjectStore for FilesystemBackend {
    #[instrument(skip(self), fields(backend = "filesystem"))]
    async fn exists(&self, key: &str) -> StorageResult<bool> {
        let path = self.key_path(key).await?;
        fs::try_exists(&path).await.map_err(StorageError::Io)
    }

    #[instrument(skip(self), fields(backend = "filesystem"))]
    async fn get(&self, key: &str) -> StorageResult<Bytes> {
        let path = self.key_path(key).await?;
        let data = fs::read(&path).await.map_err(Self::not_found(key))?;
        Ok(Bytes::from(data))
    }

    #[instrument(skip(self, data), fields(backend = "filesystem", size = data.len()))]
    async fn put(&self, key: &str, data: Bytes) -> StorageResult<()> {
        let path = self.key_path(key).await?;

        // Scratch name is hidden so listings never report half-written files.
        let scratch_path = self.root.join(format!(".tmp.{}.{key}", Uuid::new_v4()));
        let written = async {
            let mut file = fs::File::create(&scratch_path).await?;
            file.write_all(&data).await?;
            file.sync_all().await?;
            fs::rename(&scratch_path, &path).await
        }
        .await;

        if let Err(err) = written {
            let _ = fs::remove_file(&scratch_path).await;
            return Err(StorageError::Io(err));
        }
        Ok(())
    }

    #[instrument(skip(self), fields(backend = "filesystem"))]
    async fn delete(&self, key: &str) -> StorageResult<()> {
        let path = self.key_path(key).await?;
        fs::remove_file(&path).await.map_err(Self::not_found(key))
    }

    #[instrument(skip(self), fields(backend = "filesystem"))]
    async fn rename(&self, from: &str, to: &str) -> StorageResult<()> {
        let from_path = self.key_path(from).await?;
        let to_path = self.key_path(to).await?;
        fs::rename(&from_path, &to_path)
            .await
            .map_err(Self::not_found(from))
    }

    #[instrument(skip(self), fields(backend = "filesystem"))]
    async fn list(&self) -> StorageResult<Vec<String>> {
        self.file_names(|name| !is_hidden_key(name)).await
    }

    #[instrument(skip(self), fields(backend = "filesystem"))]
    async fn list_private(&self, prefix: &str) -> StorageResult<Vec<String>> {
        if !is_hidden_key(prefix) {
            return Err(StorageError::InvalidKey(format!(
                "private prefix must start with '.': {prefix}"
            )));
        }
        self.file_names(|name| name.starts_with(prefix)).await
    }

    fn backend_name(&self) -> &'static str {
        "filesystem"
    }

    #[instrument(skip(self), fields(backend = "filesystem"))]
    async fn health_check(&self) -> StorageResult<()> {
        let metadata = fs::metadata(&self.root).await.map_err(|e| {
            StorageError::Io(std::io::Error::new(
                e.kind(),
                format!("storage root not accessible: {e}"),
            ))
        })?;

        if !metadata.is_dir() {
            return Err(StorageError::Io(std::io::Error::new(
                std::io::ErrorKind::NotADirectory,
                format!("storage root is not a directory: {:?}", self.root),
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_get_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FilesystemBackend::new(dir.path()).await.unwrap();

        let data = Bytes::from("hello world");
        backend.put("object.jpg", data.clone()).await.unwrap();
        assert!(backend.exists("object.jpg").await.unwrap());
        assert_eq!(backend.get("object.jpg").await.unwrap(), data);
    }

    #[tokio::test]
    async fn test_put_leaves_no_scratch_files() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FilesystemBackend::new(dir.path()).await.unwrap();

        backend.put("a.png", Bytes::from("a")).await.unwrap();
        backend.put("a.png", Bytes::from("b")).await.unwrap();

        let names: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["a.png".to_string()]);
        assert_eq!(backend.get("a.png").await.unwrap(), Bytes::from("b"));
    }

    #[tokio::test]
    async fn test_missing_objects_are_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FilesystemBackend::new(dir.path()).await.unwrap();

        assert!(!backend.exists("missing").await.unwrap());
        assert!(backend.get("missing").await.unwrap_err().is_not_found());
        assert!(backend.delete("missing").await.unwrap_err().is_not_found());
        assert!(
            backend
                .rename("missing", "other")
                .await
                .unwrap_err()
                .is_not_found()
        );
    }

    #[tokio::test]
    async fn test_rename_moves_object() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FilesystemBackend::new(dir.path()).await.unwrap();

        backend.put("from.jpg", Bytes::from("img")).await.unwrap();
        backend.rename("from.jpg", ".claim.from.jpg").await.unwrap();

        assert!(!backend.exists("from.jpg").await.unwrap());
        assert_eq!(
            backend.get(".claim.from.jpg").await.unwrap(),
            Bytes::from("img")
        );
    }

    #[tokio::test]
    async fn test_list_skips_hidden_and_directories() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FilesystemBackend::new(dir.path()).await.unwrap();

        backend.put("b.jpg", Bytes::from("b")).await.unwrap();
        backend.put("a.jpg", Bytes::from("a")).await.unwrap();
        backend.put(".claim.c.jpg", Bytes::from("c")).await.unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();

        assert_eq!(backend.list().await.unwrap(), vec!["a.jpg", "b.jpg"]);
        assert_eq!(
            backend.list_private(".claim.").await.unwrap(),
            vec![".claim.c.jpg"]
        );
        assert!(matches!(
            backend.list_private("claim").await,
            Err(StorageError::InvalidKey(_))
        ));
    }

    #[tokio::test]
    async fn test_path_traversal_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FilesystemBackend::new(dir.path()).await.unwrap();

        for key in ["", ".", "..", "../escape", "/absolute", "a/b", "a\\b"] {
            assert!(
                matches!(
                    backend.exists(key).await,
                    Err(StorageError::InvalidKey(_))
                ),
                "{key:?}"
            );
        }
        assert!(backend.exists("valid.jpg").await.is_ok());
    }

    #[tokio::test]
    #[cfg(unix)]
    async fn test_symlink_traversal_rejected() {
        use std::os::unix::fs::symlink;

        let dir = tempfile::tempdir().unwrap();
        let outside_dir = tempfile::tempdir().unwrap();

        let outside_file = outside_dir.path().join("secret.txt");
        std::fs::write(&outside_file, "secret data").unwrap();

        let backend = FilesystemBackend::new(dir.path()).await.unwrap();
        symlink(&outside_file, dir.path().join("malicious_link")).unwrap();

        let result = backend.get("malicious_link").await;
        if let Err(StorageError::InvalidKey(msg)) = result {
            assert!(
                msg.contains("escapes storage root"),
                "error should mention escaping root: {msg}"
            );
        } else {
            panic!("expected InvalidKey error, got: {result:?}");
        }

        assert!(backend.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_health_check() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FilesystemBackend::new(dir.path().join("area")).await.unwrap();
        assert!(backend.health_check().await.is_ok());

        std::fs::remove_dir(dir.path().join("area")).unwrap();
        assert!(backend.health_check().await.is_err());
    }
}
