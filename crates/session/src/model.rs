use chrono::{DateTime, Utc};
use chunkflow_protocol::{HashFunction, SessionSnapshot, SessionStatus, human_size};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::EngineConfig;

/// Persisted state of one upload, in progress or finished.
///
/// Invariants:
/// - `offset == current_file_size`, both monotonically non-decreasing;
/// - `current_file_size <= original_file_size` (exceeding it is terminal);
/// - status transitions are monotone, terminal states never exit;
/// - `error_message` is set only when the session is `FAILED`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadSession {
    pub id: Uuid,
    pub status: SessionStatus,
    /// Relative path of the backing blob; absent until the first chunk.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blob_path: Option<String>,
    pub original_file_name: String,
    /// Total size declared by the client at creation. Immutable.
    pub original_file_size: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_file_size: Option<u64>,
    /// Advisory chunk size; not enforced per-chunk.
    pub chunk_size_hint: u64,
    pub offset: u64,
    pub current_file_size: u64,
    pub hash_function: HashFunction,
    /// Chained digest of all chunks appended so far.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub running_digest: Option<String>,
    pub retry_budget: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl UploadSession {
    /// Creates a fresh session in `INITIAL` state. `file_name` must
    /// already be sanitized.
    pub fn new(
        file_name: String,
        file_size: u64,
        hash_function: HashFunction,
        config: &EngineConfig,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            status: SessionStatus::Initial,
            blob_path: None,
            original_file_name: file_name,
            original_file_size: file_size,
            max_file_size: config.default_max_file_size,
            chunk_size_hint: config.default_chunk_size,
            offset: 0,
            current_file_size: 0,
            hash_function,
            running_digest: None,
            retry_budget: config.retry_budget,
            error_message: None,
            created_at: now,
            updated_at: now,
            completed_at: None,
        }
    }

    /// Commits a durably appended chunk: advances both size counters
    /// together and installs the new running digest.
    pub fn advance(&mut self, chunk_len: u64, running_digest: String) {
        self.offset += chunk_len;
        self.current_file_size = self.offset;
        self.running_digest = Some(running_digest);
        self.updated_at = Utc::now();
    }

    /// Marks the session `SUCCESSFUL` and stamps `completed_at`.
    pub fn succeed(&mut self) {
        let now = Utc::now();
        self.status = SessionStatus::Successful;
        self.completed_at = Some(now);
        self.updated_at = now;
    }

    /// Marks the session `FAILED` with an error message and stamps
    /// `completed_at`.
    pub fn fail(&mut self, message: impl Into<String>) {
        let now = Utc::now();
        self.status = SessionStatus::Failed;
        self.error_message = Some(message.into());
        self.completed_at = Some(now);
        self.updated_at = now;
    }

    /// Caller-facing view of the session.
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            id: self.id,
            status: self.status,
            offset: self.offset,
            chunk_size: self.chunk_size_hint,
            original_file_size: self.original_file_size,
            current_file_size: self.current_file_size,
            hr_original_file_size: human_size(self.original_file_size),
            hr_current_file_size: human_size(self.current_file_size),
            hash_function: self.hash_function,
            running_digest: self.running_digest.clone(),
            retry_budget: self.retry_budget,
            error_message: self.error_message.clone(),
        }
    }
}
