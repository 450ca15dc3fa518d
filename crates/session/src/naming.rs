//! Naming policy for uploaded files.
//!
//! Client-supplied file names are untrusted; they are reduced to a safe
//! ASCII form before ever being used as a path component. An empty
//! result is a validation failure the caller must reject.

use crate::UploadSession;

/// Special device file names on Windows that cannot be used as regular
/// file names.
const WINDOWS_DEVICE_FILES: &[&str] = &[
    "CON", "PRN", "AUX", "NUL", "COM0", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7",
    "COM8", "COM9", "LPT0", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8",
    "LPT9",
];

/// Sanitizes an untrusted file name into a safe ASCII path component.
///
/// Path separators become word breaks, whitespace runs collapse to `_`,
/// anything outside `[A-Za-z0-9_.-]` is dropped, and leading/trailing
/// `.`/`_` are trimmed. Returns `None` when nothing safe remains.
pub fn sanitize_file_name(file_name: &str) -> Option<String> {
    let spaced: String = file_name
        .chars()
        .map(|c| if c == '/' || c == '\\' { ' ' } else { c })
        .collect();

    let joined = spaced.split_whitespace().collect::<Vec<_>>().join("_");

    let filtered: String = joined
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
        .collect();

    let trimmed = filtered.trim_matches(|c| c == '.' || c == '_');
    if trimmed.is_empty() {
        return None;
    }

    let mut name = trimmed.to_owned();
    let stem = name.split('.').next().unwrap_or("").to_ascii_uppercase();
    if WINDOWS_DEVICE_FILES.contains(&stem.as_str()) {
        name = format!("_{name}");
    }

    Some(name)
}

/// File name the blob is stored under.
///
/// With `preserve_file_name` off, the name is the session id plus the
/// original extension, so nothing client-controlled reaches the path.
pub fn blob_file_name(session: &UploadSession, preserve_file_name: bool) -> String {
    if preserve_file_name {
        return session.original_file_name.clone();
    }
    match session.original_file_name.rsplit_once('.') {
        Some((_, ext)) => format!("{}.{ext}", session.id.simple()),
        None => session.id.simple().to_string(),
    }
}
