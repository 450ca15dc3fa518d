use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Hash function a session is fixed to at creation.
///
/// The choice is a closed enum; the wire form matches the uppercase
/// names clients already send (`"MD5"`, `"SHA256"`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HashFunction {
    #[serde(rename = "MD5")]
    Md5,
    #[serde(rename = "SHA1")]
    Sha1,
    #[serde(rename = "SHA256")]
    Sha256,
    #[serde(rename = "SHA512")]
    Sha512,
}

impl HashFunction {
    /// Length of the hex-encoded digest this function produces.
    pub fn hex_len(self) -> usize {
        match self {
            HashFunction::Md5 => 32,
            HashFunction::Sha1 => 40,
            HashFunction::Sha256 => 64,
            HashFunction::Sha512 => 128,
        }
    }
}

/// Lifecycle state of an upload session.
///
/// Transitions are monotone: `Initial -> Uploading -> {Successful, Failed}`.
/// A terminal session never re-enters `Uploading`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionStatus {
    Initial,
    Uploading,
    Successful,
    Failed,
}

impl SessionStatus {
    /// Returns `true` while the session can still accept chunks.
    pub fn is_active(self) -> bool {
        matches!(self, SessionStatus::Initial | SessionStatus::Uploading)
    }

    /// Returns `true` once the session has reached a terminal state.
    pub fn is_terminal(self) -> bool {
        !self.is_active()
    }
}

/// Caller-facing view of a session, returned after every operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub id: Uuid,
    pub status: SessionStatus,
    pub offset: u64,
    pub chunk_size: u64,
    pub original_file_size: u64,
    pub current_file_size: u64,
    pub hr_original_file_size: String,
    pub hr_current_file_size: String,
    pub hash_function: HashFunction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub running_digest: Option<String>,
    pub retry_budget: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

/// Formats a byte count for humans ("1.50 MB").
pub fn human_size(size: u64) -> String {
    let mut value = size as f64;
    for unit in ["B", "KB", "MB", "GB", "TB", "PB", "EB", "ZB"] {
        if value < 1024.0 {
            return format!("{value:.2} {unit}");
        }
        value /= 1024.0;
    }
    format!("{value:.2} YB")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_function_wire_names() {
        assert_eq!(serde_json::to_string(&HashFunction::Md5).unwrap(), "\"MD5\"");
        assert_eq!(
            serde_json::to_string(&HashFunction::Sha256).unwrap(),
            "\"SHA256\""
        );
        let f: HashFunction = serde_json::from_str("\"SHA512\"").unwrap();
        assert_eq!(f, HashFunction::Sha512);
    }

    #[test]
    fn unknown_hash_function_rejected() {
        let result: Result<HashFunction, _> = serde_json::from_str("\"CRC32\"");
        assert!(result.is_err());
    }

    #[test]
    fn status_wire_names() {
        assert_eq!(
            serde_json::to_string(&SessionStatus::Initial).unwrap(),
            "\"INITIAL\""
        );
        assert_eq!(
            serde_json::to_string(&SessionStatus::Successful).unwrap(),
            "\"SUCCESSFUL\""
        );
    }

    #[test]
    fn status_activity() {
        assert!(SessionStatus::Initial.is_active());
        assert!(SessionStatus::Uploading.is_active());
        assert!(SessionStatus::Successful.is_terminal());
        assert!(SessionStatus::Failed.is_terminal());
    }

    #[test]
    fn human_size_units() {
        assert_eq!(human_size(0), "0.00 B");
        assert_eq!(human_size(1023), "1023.00 B");
        assert_eq!(human_size(1024), "1.00 KB");
        assert_eq!(human_size(1536), "1.50 KB");
        assert_eq!(human_size(64 * 1024 * 1024), "64.00 MB");
    }

    #[test]
    fn snapshot_omits_empty_fields() {
        let snap = SessionSnapshot {
            id: Uuid::new_v4(),
            status: SessionStatus::Initial,
            offset: 0,
            chunk_size: 1024,
            original_file_size: 10,
            current_file_size: 0,
            hr_original_file_size: human_size(10),
            hr_current_file_size: human_size(0),
            hash_function: HashFunction::Md5,
            running_digest: None,
            retry_budget: 2,
            error_message: None,
        };
        let json = serde_json::to_string(&snap).unwrap();
        assert!(!json.contains("runningDigest"));
        assert!(!json.contains("errorMessage"));
        assert!(json.contains("originalFileSize"));
    }
}
