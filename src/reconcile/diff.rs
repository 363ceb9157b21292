//! Set difference between two fingerprint indexes.

use std::path::PathBuf;

use super::FingerprintIndex;

/// Source paths whose content has no copy anywhere in the target.
pub type MissingFileSet = Vec<PathBuf>;

/// Every source file whose digest does not occur in `target`.
///
/// Membership is decided by digest alone: names, locations and copy counts
/// in the target are irrelevant. A source file with two identical siblings
/// is either reported three times or not at all. Runs in linear time; the
/// order of the result follows the source index and is unspecified.
#[must_use]
pub fn missing(source: &FingerprintIndex, target: &FingerprintIndex) -> MissingFileSet {
    source
        .iter()
        .filter(|(digest, _)| !target.contains(digest))
        .flat_map(|(_, paths)| paths.iter().cloned())
        .collect()
}
