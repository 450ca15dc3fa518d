use crate::BlobStoreError;

/// Validates the store-relative shape of a blob path.
///
/// Blob paths are engine-generated (`uploads/<date>/<session>/<name>`),
/// never client-controlled, so the check is strict: the path must sit
/// under `uploads/`, have at least one segment below it, and every
/// segment must be a plain name — no empty segments, no `.` or `..`,
/// no backslashes or drive prefixes that a Windows filesystem would
/// reinterpret.
pub fn validate_blob_path(blob_path: &str) -> Result<(), BlobStoreError> {
    let mut segments = blob_path.split('/');

    if segments.next() != Some("uploads") {
        return Err(BlobStoreError::InvalidPath(format!(
            "blob path must be store-relative under uploads/: {blob_path}"
        )));
    }

    let mut below_root = 0usize;
    for segment in segments {
        if segment.is_empty() || segment == "." || segment == ".." {
            return Err(BlobStoreError::InvalidPath(format!(
                "blob path segment {segment:?} not allowed: {blob_path}"
            )));
        }
        if segment.contains('\\') || segment.contains(':') {
            return Err(BlobStoreError::InvalidPath(format!(
                "blob path segment {segment:?} not allowed: {blob_path}"
            )));
        }
        below_root += 1;
    }

    if below_root == 0 {
        return Err(BlobStoreError::InvalidPath(format!(
            "blob path has no file name: {blob_path}"
        )));
    }

    Ok(())
}
