//! Append-only blob storage for upload sessions.
//!
//! A blob is the byte sequence backing one session's received data. The
//! session engine owns the blob's lifecycle: it is created on the first
//! chunk, appended to on every later chunk, and deleted when the session
//! fails (unless failed blobs are preserved).
//!
//! `append_bytes` must be durable before returning `Ok` — the engine
//! commits the session's new offset only after a successful append.

mod fs;
mod validation;

pub use fs::FsBlobStore;
pub use validation::validate_blob_path;

use async_trait::async_trait;

/// Reference to a stored blob: a relative path within the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobRef(pub String);

impl BlobRef {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Errors produced by blob storage.
#[derive(Debug, thiserror::Error)]
pub enum BlobStoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid blob path: {0}")]
    InvalidPath(String),

    #[error("blob not found: {0}")]
    NotFound(String),
}

/// Append-only byte storage keyed by a relative path.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Creates a new blob for a session and writes its initial content.
    ///
    /// `file_name` has already been sanitized by the caller's naming
    /// policy; this only decides where the blob lives within the store.
    async fn create(
        &self,
        session_id: uuid::Uuid,
        file_name: &str,
        initial: &[u8],
    ) -> Result<BlobRef, BlobStoreError>;

    /// Appends bytes to an existing blob. Durable on `Ok`.
    async fn append_bytes(&self, blob: &BlobRef, bytes: &[u8]) -> Result<(), BlobStoreError>;

    /// Deletes a blob. Deleting a missing blob is not an error.
    async fn delete(&self, blob: &BlobRef) -> Result<(), BlobStoreError>;

    /// Returns `true` if the blob exists.
    async fn exists(&self, blob: &BlobRef) -> bool;
}
