use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use crate::{BlobRef, BlobStore, BlobStoreError, validate_blob_path};

/// Filesystem-backed blob store rooted at a base directory.
///
/// Blobs live under `uploads/YYYY/MM/DD/<session_id>/<file_name>` so two
/// sessions uploading the same file name never collide. Appends are
/// fsynced before returning, which is what lets the engine treat a
/// successful append as durable.
pub struct FsBlobStore {
    base_dir: PathBuf,
}

impl FsBlobStore {
    /// Creates a store rooted at `base_dir`. The directory itself is
    /// created lazily on the first blob.
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// Returns the store's root directory.
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn full_path(&self, blob: &BlobRef) -> Result<PathBuf, BlobStoreError> {
        validate_blob_path(blob.as_str())?;
        Ok(self.base_dir.join(blob.as_str()))
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn create(
        &self,
        session_id: Uuid,
        file_name: &str,
        initial: &[u8],
    ) -> Result<BlobRef, BlobStoreError> {
        let dated = Utc::now().format("uploads/%Y/%m/%d");
        let relative = format!("{dated}/{session_id}/{file_name}");
        validate_blob_path(&relative)?;

        let full = self.base_dir.join(&relative);
        if let Some(parent) = full.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut file = tokio::fs::OpenOptions::new()
            .create_new(true)
            .write(true)
            .open(&full)
            .await?;
        file.write_all(initial).await?;
        file.sync_all().await?;

        tracing::debug!(%session_id, path = %relative, bytes = initial.len(), "blob created");
        Ok(BlobRef(relative))
    }

    async fn append_bytes(&self, blob: &BlobRef, bytes: &[u8]) -> Result<(), BlobStoreError> {
        let full = self.full_path(blob)?;

        let mut file = match tokio::fs::OpenOptions::new().append(true).open(&full).await {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(BlobStoreError::NotFound(blob.as_str().to_owned()));
            }
            Err(e) => return Err(e.into()),
        };
        file.write_all(bytes).await?;
        file.sync_all().await?;
        Ok(())
    }

    async fn delete(&self, blob: &BlobRef) -> Result<(), BlobStoreError> {
        let full = self.full_path(blob)?;
        match tokio::fs::remove_file(&full).await {
            Ok(()) => {
                tracing::debug!(path = %blob.as_str(), "blob deleted");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn exists(&self, blob: &BlobRef) -> bool {
        match self.full_path(blob) {
            Ok(full) => tokio::fs::try_exists(&full).await.unwrap_or(false),
            Err(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn create_writes_initial_content() {
        let dir = TempDir::new().unwrap();
        let store = FsBlobStore::new(dir.path());
        let id = Uuid::new_v4();

        let blob = store.create(id, "archive.tar", b"first").await.unwrap();
        assert!(blob.as_str().starts_with("uploads/"));
        assert!(blob.as_str().ends_with("archive.tar"));
        assert!(store.exists(&blob).await);

        let content = std::fs::read(dir.path().join(blob.as_str())).unwrap();
        assert_eq!(&content, b"first");
    }

    #[tokio::test]
    async fn append_extends_blob() {
        let dir = TempDir::new().unwrap();
        let store = FsBlobStore::new(dir.path());
        let blob = store
            .create(Uuid::new_v4(), "out.bin", b"Hello")
            .await
            .unwrap();

        store.append_bytes(&blob, b" World").await.unwrap();

        let content = std::fs::read(dir.path().join(blob.as_str())).unwrap();
        assert_eq!(&content, b"Hello World");
    }

    #[tokio::test]
    async fn append_to_missing_blob_fails() {
        let dir = TempDir::new().unwrap();
        let store = FsBlobStore::new(dir.path());
        let blob = BlobRef("uploads/nope.bin".into());

        let result = store.append_bytes(&blob, b"data").await;
        assert!(matches!(result, Err(BlobStoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn delete_removes_blob_and_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let store = FsBlobStore::new(dir.path());
        let blob = store
            .create(Uuid::new_v4(), "gone.bin", b"x")
            .await
            .unwrap();

        store.delete(&blob).await.unwrap();
        assert!(!store.exists(&blob).await);

        // Second delete is a no-op.
        store.delete(&blob).await.unwrap();
    }

    #[tokio::test]
    async fn create_same_name_different_sessions() {
        let dir = TempDir::new().unwrap();
        let store = FsBlobStore::new(dir.path());

        let a = store.create(Uuid::new_v4(), "same.bin", b"a").await.unwrap();
        let b = store.create(Uuid::new_v4(), "same.bin", b"b").await.unwrap();
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn traversal_path_rejected() {
        let dir = TempDir::new().unwrap();
        let store = FsBlobStore::new(dir.path());
        let blob = BlobRef("../escape.bin".into());

        let result = store.append_bytes(&blob, b"evil").await;
        assert!(matches!(result, Err(BlobStoreError::InvalidPath(_))));
    }
}
