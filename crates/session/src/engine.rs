//! Session engine: the sole mutator of upload-session state.
//!
//! Orchestrates chunk ingestion: validates the request, verifies and
//! chains the chunk digest, appends to the blob, applies the retry
//! policy on transient failures, transitions session status, and
//! persists the record. Appends for one session id are serialized by a
//! per-session lock; different sessions proceed independently.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use chunkflow_blobstore::{BlobRef, BlobStore};
use chunkflow_protocol::{
    AppendChunkRequest, SessionStatus, StartUploadRequest, human_size,
};
use uuid::Uuid;

use crate::guard::{self, Completion};
use crate::retry::RetryDecision;
use crate::{
    EngineConfig, RetryPolicy, SessionError, SessionRepository, UploadSession, hash, naming,
};

/// Kind of transient failure routed through the retry policy.
enum Transient {
    Corrupted,
    Storage,
}

/// Orchestrates upload sessions over a blob store and a session
/// repository.
pub struct SessionEngine {
    config: EngineConfig,
    retry: RetryPolicy,
    repo: Arc<dyn SessionRepository>,
    store: Arc<dyn BlobStore>,
    /// One lock per in-flight session id. Entries are pruned as soon
    /// as no append holds them.
    locks: Mutex<HashMap<Uuid, Arc<tokio::sync::Mutex<()>>>>,
}

impl SessionEngine {
    pub fn new(
        config: EngineConfig,
        repo: Arc<dyn SessionRepository>,
        store: Arc<dyn BlobStore>,
    ) -> Self {
        let retry = RetryPolicy::new(config.retry_budget);
        Self {
            config,
            retry,
            repo,
            store,
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Starts a new session or resumes an existing one.
    ///
    /// Resume (`session_id` set) is idempotent: the stored session is
    /// returned unmutated. New sessions require `file_name` and
    /// `file_size`; the name is sanitized and the declared size checked
    /// against the configured maximum before anything is persisted.
    pub async fn start_or_resume(
        &self,
        request: StartUploadRequest,
    ) -> Result<UploadSession, SessionError> {
        if let Some(id) = request.session_id {
            let session = self
                .repo
                .get(id)
                .await?
                .ok_or(SessionError::NotFound(id))?;
            tracing::debug!(%id, offset = session.offset, "session resumed");
            return Ok(session);
        }

        let file_name = request
            .file_name
            .ok_or_else(|| SessionError::Validation("fileName is required".into()))?;
        let file_size = request
            .file_size
            .ok_or_else(|| SessionError::Validation("fileSize is required".into()))?;

        if file_name.len() > 512 {
            return Err(SessionError::Validation("file name is too long".into()));
        }
        if !file_name.contains('.') {
            return Err(SessionError::Validation(
                "invalid file name: file name must have an extension".into(),
            ));
        }
        let sanitized = naming::sanitize_file_name(&file_name).ok_or_else(|| {
            SessionError::Validation("invalid file name: nothing remains after sanitization".into())
        })?;

        if let Some(max) = self.config.default_max_file_size {
            if file_size > max {
                return Err(SessionError::Validation(format!(
                    "file size is greater than the maximum allowed file size, {}",
                    human_size(max)
                )));
            }
        }

        let hash_function = request
            .hash_function
            .unwrap_or(self.config.default_hash_function);
        let session = UploadSession::new(sanitized, file_size, hash_function, &self.config);
        let session = self.repo.create(session).await?;
        tracing::info!(
            id = %session.id,
            file = %session.original_file_name,
            size = file_size,
            "upload session created"
        );
        Ok(session)
    }

    /// Appends one chunk to a session.
    ///
    /// `request.offset` must equal the session's stored offset (the
    /// compare acts as the optimistic precondition for resent or
    /// duplicated chunks). Returns the updated session on success, a
    /// retryable error for transient failures, or a terminal error once
    /// the session has been failed and its blob reclaimed.
    pub async fn append_chunk(
        &self,
        request: AppendChunkRequest,
        bytes: &[u8],
    ) -> Result<UploadSession, SessionError> {
        let session_id = request.session_id;
        let lock = self.session_lock(session_id);
        let result = {
            let _guard = lock.lock().await;
            self.append_chunk_locked(request, bytes).await
        };
        drop(lock);
        self.prune_lock(session_id);
        result
    }

    async fn append_chunk_locked(
        &self,
        request: AppendChunkRequest,
        bytes: &[u8],
    ) -> Result<UploadSession, SessionError> {
        let mut session = self
            .repo
            .get(request.session_id)
            .await?
            .ok_or(SessionError::NotFound(request.session_id))?;

        if !session.status.is_active() {
            return Err(SessionError::WrongState {
                id: session.id,
                status: session.status,
            });
        }
        if session.offset != request.offset {
            return Err(SessionError::Validation(format!(
                "offset does not match: expected {}, got {}",
                session.offset, request.offset
            )));
        }
        if bytes.is_empty() {
            return Err(SessionError::Validation("chunk must not be empty".into()));
        }
        // A malformed claim is a bad request, not a corrupted chunk: it
        // can never match any digest, so it is rejected before the
        // retry budget comes into play.
        let hex_len = session.hash_function.hex_len();
        if request.chunk_hash.len() != hex_len
            || !request.chunk_hash.bytes().all(|b| b.is_ascii_hexdigit())
        {
            return Err(SessionError::Validation(format!(
                "chunkHash must be a {hex_len}-character hex digest"
            )));
        }

        // Size pre-check against the hard ceiling. Terminal, no retry.
        if guard::exceeds_max(session.current_file_size, bytes.len() as u64, session.max_file_size)
        {
            return Err(self
                .fail_terminal(&mut session, SessionError::FileTooLarge)
                .await);
        }

        // Verify the chunk digest before anything touches storage.
        let actual = hash::digest_bytes(session.hash_function, bytes);
        if actual != request.chunk_hash {
            return Err(self
                .transient_failure(&mut session, Transient::Corrupted)
                .await);
        }
        let next_digest =
            hash::chain(session.hash_function, session.running_digest.as_deref(), &actual);

        match session.blob_path.clone() {
            Some(path) => {
                let blob = BlobRef(path);
                if let Err(e) = self.store.append_bytes(&blob, bytes).await {
                    tracing::warn!(id = %session.id, error = %e, "chunk append failed");
                    return Err(self
                        .transient_failure(&mut session, Transient::Storage)
                        .await);
                }
            }
            None => {
                // First chunk: a creation failure means the session
                // never got off the ground. It propagates as-is and
                // does not consume retry budget.
                let name = naming::blob_file_name(&session, self.config.preserve_file_name);
                let blob = self.store.create(session.id, &name, bytes).await?;
                session.blob_path = Some(blob.0);
                if session.status == SessionStatus::Initial {
                    session.status = SessionStatus::Uploading;
                }
            }
        }

        // The append is durable; commit it and end any failure streak.
        session.retry_budget = self.retry.initial_budget();
        session.advance(bytes.len() as u64, next_digest);

        match guard::classify(session.current_file_size, session.original_file_size) {
            Completion::Incomplete => {}
            Completion::Complete => {
                if session.running_digest.as_deref() == request.final_hash.as_deref() {
                    session.succeed();
                    tracing::info!(
                        id = %session.id,
                        size = session.current_file_size,
                        "upload completed"
                    );
                } else {
                    return Err(self
                        .fail_terminal(&mut session, SessionError::FinalHashMismatch)
                        .await);
                }
            }
            Completion::Overrun => {
                return Err(self
                    .fail_terminal(&mut session, SessionError::SizeOverrun)
                    .await);
            }
        }

        self.repo.save(&session).await?;
        Ok(session)
    }

    /// Routes a transient failure through the retry policy. Only the
    /// retry budget changes; offset, size, and running digest stay as
    /// they were (the failed chunk contributed nothing).
    async fn transient_failure(
        &self,
        session: &mut UploadSession,
        kind: Transient,
    ) -> SessionError {
        match self.retry.consume(&mut session.retry_budget) {
            RetryDecision::Retry { remaining } => {
                session.updated_at = Utc::now();
                if let Err(e) = self.repo.save(session).await {
                    return e.into();
                }
                tracing::warn!(
                    id = %session.id,
                    remaining,
                    "transient chunk failure, retry allowed"
                );
                match kind {
                    Transient::Corrupted => SessionError::ChunkCorrupted {
                        remaining_retries: remaining,
                    },
                    Transient::Storage => SessionError::StorageRetry {
                        remaining_retries: remaining,
                    },
                }
            }
            RetryDecision::Exhausted => {
                let message = match kind {
                    Transient::Corrupted => "sent chunk is corrupted",
                    Transient::Storage => "failed to store the chunk",
                };
                self.fail_terminal(
                    session,
                    SessionError::RetriesExhausted {
                        message: message.into(),
                    },
                )
                .await
            }
        }
    }

    /// Fails the session terminally: persists the `FAILED` record,
    /// reclaims the partial blob, and returns the error to surface.
    async fn fail_terminal(
        &self,
        session: &mut UploadSession,
        error: SessionError,
    ) -> SessionError {
        session.fail(error.to_string());
        if let Err(e) = self.repo.save(session).await {
            return e.into();
        }
        self.reclaim_blob(session).await;
        tracing::error!(id = %session.id, error = %error, "session failed");
        error
    }

    /// Deletes the session's partial blob unless failed blobs are
    /// preserved. A delete failure is logged, not raised: the terminal
    /// error already on its way out is the one the caller must see.
    async fn reclaim_blob(&self, session: &UploadSession) {
        if self.config.preserve_failed_blob {
            return;
        }
        if let Some(path) = &session.blob_path {
            let blob = BlobRef(path.clone());
            if let Err(e) = self.store.delete(&blob).await {
                tracing::warn!(id = %session.id, error = %e, "failed to delete partial blob");
            }
        }
    }

    fn session_lock(&self, id: Uuid) -> Arc<tokio::sync::Mutex<()>> {
        self.locks.lock().unwrap().entry(id).or_default().clone()
    }

    /// Drops the lock entry once no append holds a clone of it, so
    /// abandoned sessions do not accumulate locks for the process
    /// lifetime. A concurrent append cloned the Arc before this runs
    /// and keeps the strong count above one, which preserves the
    /// one-in-flight-append-per-session guarantee.
    fn prune_lock(&self, id: Uuid) {
        let mut locks = self.locks.lock().unwrap();
        if let Some(entry) = locks.get(&id) {
            if Arc::strong_count(entry) == 1 {
                locks.remove(&id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{InMemorySessionRepository, hash};
    use chunkflow_blobstore::FsBlobStore;
    use chunkflow_protocol::HashFunction;
    use tempfile::TempDir;

    fn engine(dir: &TempDir) -> SessionEngine {
        SessionEngine::new(
            EngineConfig::default(),
            Arc::new(InMemorySessionRepository::new()),
            Arc::new(FsBlobStore::new(dir.path())),
        )
    }

    async fn started(engine: &SessionEngine, file_size: u64) -> UploadSession {
        engine
            .start_or_resume(StartUploadRequest {
                file_name: Some("save.dat".into()),
                file_size: Some(file_size),
                ..Default::default()
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn lock_map_is_pruned_after_appends() {
        let dir = TempDir::new().unwrap();
        let engine = engine(&dir);
        let session = started(&engine, 8).await;

        let chunk: &[u8] = b"abcd";
        let request = AppendChunkRequest {
            session_id: session.id,
            offset: 0,
            chunk_hash: hash::digest_bytes(HashFunction::Md5, chunk),
            final_hash: None,
        };
        engine.append_chunk(request, chunk).await.unwrap();

        // Mid-upload, not terminal, yet no entry lingers.
        assert!(engine.locks.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn lock_map_is_pruned_after_rejected_append() {
        let dir = TempDir::new().unwrap();
        let engine = engine(&dir);
        let session = started(&engine, 8).await;

        let request = AppendChunkRequest {
            session_id: session.id,
            offset: 3, // stored offset is 0
            chunk_hash: hash::digest_bytes(HashFunction::Md5, b"abcd"),
            final_hash: None,
        };
        engine.append_chunk(request, b"abcd").await.unwrap_err();

        assert!(engine.locks.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn malformed_chunk_hash_is_rejected_before_budget() {
        let dir = TempDir::new().unwrap();
        let engine = engine(&dir);
        let session = started(&engine, 8).await;

        // Wrong length for MD5 (32 hex chars expected).
        let short = AppendChunkRequest {
            session_id: session.id,
            offset: 0,
            chunk_hash: "abc123".into(),
            final_hash: None,
        };
        let err = engine.append_chunk(short, b"abcd").await.unwrap_err();
        assert!(matches!(err, SessionError::Validation(_)));

        // Right length, non-hex content.
        let non_hex = AppendChunkRequest {
            session_id: session.id,
            offset: 0,
            chunk_hash: "z".repeat(32),
            final_hash: None,
        };
        let err = engine.append_chunk(non_hex, b"abcd").await.unwrap_err();
        assert!(matches!(err, SessionError::Validation(_)));

        // Neither attempt consumed retry budget or moved the session.
        let after = engine.repo.get(session.id).await.unwrap().unwrap();
        assert_eq!(after.retry_budget, 2);
        assert_eq!(after.offset, 0);
    }
}
