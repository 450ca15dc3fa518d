use chunkflow_protocol::HashFunction;

/// Engine configuration, constructed once at process start and passed
/// into [`crate::SessionEngine::new`]. No ambient lookup.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Advisory chunk size reported to clients (not enforced per-chunk).
    pub default_chunk_size: u64,
    /// Hard ceiling on total file size. `None` means unlimited.
    pub default_max_file_size: Option<u64>,
    /// Hash function used when the client does not request one.
    pub default_hash_function: HashFunction,
    /// Consecutive transient failures a session tolerates before failing.
    pub retry_budget: u32,
    /// Keep the partial blob on disk when a session fails.
    pub preserve_failed_blob: bool,
    /// Store blobs under the client's (sanitized) file name instead of
    /// the session id plus extension.
    pub preserve_file_name: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_chunk_size: 64 * 1_000_000,
            default_max_file_size: None,
            default_hash_function: HashFunction::Md5,
            retry_budget: 2,
            preserve_failed_blob: false,
            preserve_file_name: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.default_chunk_size, 64_000_000);
        assert_eq!(cfg.default_max_file_size, None);
        assert_eq!(cfg.default_hash_function, HashFunction::Md5);
        assert_eq!(cfg.retry_budget, 2);
        assert!(!cfg.preserve_failed_blob);
        assert!(cfg.preserve_file_name);
    }
}
