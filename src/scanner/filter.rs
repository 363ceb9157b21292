//! Eligibility rules for fingerprinting.
//!
//! A path is eligible when its file name does not start with `.` or `$`
//! (hidden, lock and temp files) and its lowercase extension is included by
//! the [`HashingPolicy`] and not excluded by it. Exclusion is a veto.
//!
//! Everything here is pure: no file system access.

use std::path::Path;

use super::HashingPolicy;

/// Whether the file name marks a hidden, lock or temp file.
#[must_use]
pub fn is_hidden_name(path: &Path) -> bool {
    path.file_name()
        .map(|n| n.to_string_lossy())
        .is_some_and(|name| name.starts_with('.') || name.starts_with('$'))
}

/// The lowercase, dot-prefixed extension of `path`, if it has one.
#[must_use]
pub fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .map(|ext| format!(".{}", ext.to_string_lossy().to_lowercase()))
}

/// Normalize a user-supplied extension to `.ext` lowercase form.
///
/// Returns `None` for blank input.
#[must_use]
pub fn normalize_extension(raw: &str) -> Option<String> {
    let trimmed = raw.trim().trim_start_matches('.');
    if trimmed.is_empty() {
        return None;
    }
    Some(format!(".{}", trimmed.to_lowercase()))
}

/// Whether `path` should be fingerprinted under `policy`.
#[must_use]
pub fn is_eligible(path: &Path, policy: &HashingPolicy) -> bool {
    if is_hidden_name(path) {
        return false;
    }

    match extension_of(path) {
        Some(ext) => {
            policy.included_extensions.contains(&ext) && !policy.excluded_extensions.contains(&ext)
        }
        None => false,
    }
}
