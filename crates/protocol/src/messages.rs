use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Request to start a new upload session or resume an existing one.
///
/// With `session_id` set this is a resume: the stored session is returned
/// as-is and every other field is ignored. Without it, `file_name` and
/// `file_size` are required.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartUploadRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<Uuid>,
    /// Advisory resume offset; the server's stored offset is authoritative.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_size: Option<u64>,
    /// Hash function the client used for per-chunk digests.
    /// `None` falls back to the configured default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash_function: Option<crate::HashFunction>,
}

/// Metadata accompanying one chunk of file data.
///
/// The chunk bytes themselves travel out of band (multipart body, binary
/// frame, ...); the transport adapter pairs them with this request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppendChunkRequest {
    pub session_id: Uuid,
    /// Byte offset this chunk starts at; must equal the session's offset.
    pub offset: u64,
    /// Client-computed digest over just this chunk's bytes, hex-encoded.
    pub chunk_hash: String,
    /// Expected final chained digest; required on the last chunk.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_hash: Option<String>,
}
