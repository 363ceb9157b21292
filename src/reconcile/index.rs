//! Digest-to-paths index for one tree.
//!
//! # Overview
//!
//! A [`FingerprintIndex`] groups every fingerprinted file of a tree by its
//! digest. Files with identical content share a group; the order of paths
//! inside a group follows record arrival and carries no meaning.
//!
//! # Example
//!
//! ```
//! use hashrecon::reconcile::FingerprintIndex;
//! use hashrecon::scanner::FingerprintRecord;
//!
//! let index: FingerprintIndex = vec![
//!     FingerprintRecord::new("/src/a.txt", "d1"),
//!     FingerprintRecord::new("/src/b.txt", "d1"),
//!     FingerprintRecord::new("/src/c.txt", "d2"),
//! ]
//! .into_iter()
//! .collect();
//!
//! assert_eq!(index.file_count(), 3);
//! assert_eq!(index.digest_count(), 2);
//! assert!(index.contains("d1"));
//! ```

use std::collections::HashMap;
use std::path::PathBuf;

use crate::scanner::{Digest, FingerprintRecord};

/// Files of one tree grouped by content digest.
#[derive(Debug, Clone, Default)]
pub struct FingerprintIndex {
    groups: HashMap<Digest, Vec<PathBuf>>,
    files: usize,
}

impl FingerprintIndex {
    /// Create an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record's path to the group for its digest.
    pub fn insert(&mut self, record: FingerprintRecord) {
        self.groups
            .entry(record.digest)
            .or_default()
            .push(record.path);
        self.files += 1;
    }

    /// Whether any file with this digest was indexed.
    #[must_use]
    pub fn contains(&self, digest: &str) -> bool {
        self.groups.contains_key(digest)
    }

    /// Paths sharing `digest`, if any.
    #[must_use]
    pub fn paths(&self, digest: &str) -> Option<&[PathBuf]> {
        self.groups.get(digest).map(Vec::as_slice)
    }

    /// Number of distinct digests.
    #[must_use]
    pub fn digest_count(&self) -> usize {
        self.groups.len()
    }

    /// Number of indexed files, counting every member of every group.
    #[must_use]
    pub fn file_count(&self) -> usize {
        self.files
    }

    /// Whether nothing was indexed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files == 0
    }

    /// Iterate over `(digest, paths)` groups in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (&Digest, &Vec<PathBuf>)> {
        self.groups.iter()
    }

    /// Groups holding more than one file, i.e. duplicated content.
    pub fn duplicate_groups(&self) -> impl Iterator<Item = (&Digest, &Vec<PathBuf>)> {
        self.groups.iter().filter(|(_, paths)| paths.len() > 1)
    }
}

impl Extend<FingerprintRecord> for FingerprintIndex {
    fn extend<T: IntoIterator<Item = FingerprintRecord>>(&mut self, iter: T) {
        for record in iter {
            self.insert(record);
        }
    }
}

impl FromIterator<FingerprintRecord> for FingerprintIndex {
    fn from_iter<T: IntoIterator<Item = FingerprintRecord>>(iter: T) -> Self {
        let mut index = Self::new();
        index.extend(iter);
        index
    }
}
