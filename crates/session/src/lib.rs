//! Upload-session state machine.
//!
//! Tracks how many bytes of a file have been durably received, verifies
//! each chunk against a client-supplied digest, chains those digests into
//! a running session digest, enforces size limits, and decides when a
//! session is complete, retryable, or permanently failed.
//!
//! The [`SessionEngine`] is the sole mutator of session state. Storage
//! ([`chunkflow_blobstore::BlobStore`]) and persistence
//! ([`SessionRepository`]) are collaborators it calls into; the hash
//! chain, size guard, and retry policy are pure checks it applies.

pub mod config;
pub mod engine;
pub mod guard;
pub mod hash;
pub mod model;
pub mod naming;
pub mod repo;
pub mod retry;

pub use config::EngineConfig;
pub use engine::SessionEngine;
pub use model::UploadSession;
pub use repo::{InMemorySessionRepository, RepositoryError, SessionRepository};
pub use retry::{RetryDecision, RetryPolicy};

use chunkflow_protocol::SessionStatus;
use uuid::Uuid;

/// Errors produced by session operations.
///
/// Three families matter to callers:
/// - retryable ([`Self::ChunkCorrupted`], [`Self::StorageRetry`]): resend
///   the same chunk, bounded by the session's retry budget;
/// - terminal ([`Self::FileTooLarge`], [`Self::SizeOverrun`],
///   [`Self::FinalHashMismatch`], [`Self::RetriesExhausted`]): the session
///   is now `FAILED` and must be restarted under a new id;
/// - request errors (the rest): nothing was mutated.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("{0}")]
    Validation(String),

    #[error("session not found: {0}")]
    NotFound(Uuid),

    #[error("session {id} is not accepting chunks (status {status:?})")]
    WrongState { id: Uuid, status: SessionStatus },

    #[error("sent chunk is corrupted, retry uploading the chunk ({remaining_retries} retries left)")]
    ChunkCorrupted { remaining_retries: u32 },

    #[error("failed to store the chunk, retry uploading the chunk ({remaining_retries} retries left)")]
    StorageRetry { remaining_retries: u32 },

    #[error("file size exceeded the maximum allowed size")]
    FileTooLarge,

    #[error("file size exceeded the original file size")]
    SizeOverrun,

    #[error("file is corrupted")]
    FinalHashMismatch,

    #[error("retries exhausted: {message}")]
    RetriesExhausted { message: String },

    #[error("blob store error: {0}")]
    BlobStore(#[from] chunkflow_blobstore::BlobStoreError),

    #[error("repository error: {0}")]
    Repository(#[from] RepositoryError),
}

impl SessionError {
    /// Returns `true` if the caller may resend the same chunk.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SessionError::ChunkCorrupted { .. } | SessionError::StorageRetry { .. }
        )
    }

    /// Remaining retry budget, for retryable errors.
    pub fn remaining_retries(&self) -> Option<u32> {
        match self {
            SessionError::ChunkCorrupted { remaining_retries }
            | SessionError::StorageRetry { remaining_retries } => Some(*remaining_retries),
            _ => None,
        }
    }
}
