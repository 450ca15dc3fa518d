//! Size limit and completion checks. Pure functions; the engine acts on
//! the answers.

/// Returns `true` if appending `chunk_len` bytes would push the file past
/// the configured maximum. Always terminal, never retryable.
pub fn exceeds_max(current_file_size: u64, chunk_len: u64, max_file_size: Option<u64>) -> bool {
    match max_file_size {
        Some(max) => current_file_size + chunk_len > max,
        None => false,
    }
}

/// Where a session stands relative to its declared total size after an
/// append.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// More chunks expected.
    Incomplete,
    /// Exactly reached the declared size; the final digest decides
    /// success or failure.
    Complete,
    /// The client sent more bytes than declared. Terminal.
    Overrun,
}

/// Classifies the post-append file size against the declared total.
pub fn classify(current_file_size: u64, original_file_size: u64) -> Completion {
    if current_file_size == original_file_size {
        Completion::Complete
    } else if current_file_size > original_file_size {
        Completion::Overrun
    } else {
        Completion::Incomplete
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_limit_never_exceeds() {
        assert!(!exceeds_max(u64::MAX - 1, 1, None));
    }

    #[test]
    fn limit_boundary() {
        assert!(!exceeds_max(4, 1, Some(5)));
        assert!(exceeds_max(4, 2, Some(5)));
        assert!(exceeds_max(0, 6, Some(5)));
    }

    #[test]
    fn classify_states() {
        assert_eq!(classify(4, 10), Completion::Incomplete);
        assert_eq!(classify(10, 10), Completion::Complete);
        assert_eq!(classify(11, 10), Completion::Overrun);
    }
}
