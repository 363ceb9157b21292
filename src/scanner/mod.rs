//! Scanner module for directory traversal and content fingerprinting.
//!
//! This module provides functionality for:
//! - Deciding which files take part in reconciliation ([`filter`])
//! - Lazy, fail-soft directory walking ([`walker`])
//! - Full and head/tail partial fingerprinting with BLAKE3 ([`hasher`])
//!
//! # Example
//!
//! ```no_run
//! use hashrecon::scanner::{Hasher, HashingPolicy, Walker, WalkerConfig};
//! use std::path::Path;
//!
//! let policy = HashingPolicy::new([".txt"], [".tmp"], 100 * 1024 * 1024, 1024 * 1024);
//! let hasher = Hasher::from_policy(&policy);
//!
//! let walker = Walker::new(Path::new("."), WalkerConfig::default());
//! for entry in walker.walk() {
//!     match entry {
//!         Ok(path) if hashrecon::scanner::is_eligible(&path, &policy) => {
//!             if let Ok(digest) = hasher.fingerprint(&path) {
//!                 println!("{digest}  {}", path.display());
//!             }
//!         }
//!         Ok(_) => {}
//!         Err(e) => eprintln!("Warning: {}", e),
//!     }
//! }
//! ```

pub mod filter;
pub mod hasher;
pub mod walker;

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

// Re-export main types
pub use filter::{extension_of, is_eligible, is_hidden_name, normalize_extension};
pub use hasher::{Digest, Hasher};
pub use walker::Walker;

/// Default size above which only the head and tail of a file are hashed.
pub const DEFAULT_LARGE_FILE_THRESHOLD: u64 = 100 * 1024 * 1024;

/// Default number of bytes hashed from each end of a large file.
pub const DEFAULT_PARTIAL_HASH_SIZE: u64 = 1024 * 1024;

/// Rules deciding which files are fingerprinted and how.
///
/// Immutable for the duration of a run. Extensions are stored lowercase and
/// dot-prefixed (`".txt"`); [`HashingPolicy::new`] normalizes its input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HashingPolicy {
    /// Extensions eligible for hashing.
    pub included_extensions: BTreeSet<String>,
    /// Extensions never hashed, even when also included.
    pub excluded_extensions: BTreeSet<String>,
    /// Files strictly larger than this are hashed head+tail only.
    pub large_file_threshold: u64,
    /// Bytes hashed from each end of a large file.
    pub partial_hash_size: u64,
}

impl Default for HashingPolicy {
    fn default() -> Self {
        Self {
            included_extensions: BTreeSet::new(),
            excluded_extensions: BTreeSet::new(),
            large_file_threshold: DEFAULT_LARGE_FILE_THRESHOLD,
            partial_hash_size: DEFAULT_PARTIAL_HASH_SIZE,
        }
    }
}

impl HashingPolicy {
    /// Create a policy, normalizing extension spellings.
    ///
    /// `"TXT"`, `".txt"` and `" .Txt "` all become `".txt"`. Blank entries
    /// are dropped.
    #[must_use]
    pub fn new<I, E, S, T>(
        included: I,
        excluded: E,
        large_file_threshold: u64,
        partial_hash_size: u64,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        E: IntoIterator<Item = T>,
        S: AsRef<str>,
        T: AsRef<str>,
    {
        Self {
            included_extensions: included
                .into_iter()
                .filter_map(|e| normalize_extension(e.as_ref()))
                .collect(),
            excluded_extensions: excluded
                .into_iter()
                .filter_map(|e| normalize_extension(e.as_ref()))
                .collect(),
            large_file_threshold,
            partial_hash_size,
        }
    }

    /// Whether a file of `size` bytes is fingerprinted head+tail only.
    #[must_use]
    pub fn is_partial(&self, size: u64) -> bool {
        size > self.large_file_threshold
    }
}

/// Configuration for directory walking.
#[derive(Debug, Clone)]
pub struct WalkerConfig {
    /// Follow symbolic links during traversal.
    /// Warning: symlink cycles abort the walk.
    pub follow_symlinks: bool,

    /// Drop files whose name starts with `.` or `$` before they are queued.
    pub skip_hidden: bool,
}

impl Default for WalkerConfig {
    fn default() -> Self {
        Self {
            follow_symlinks: false,
            skip_hidden: true,
        }
    }
}

impl WalkerConfig {
    /// Set whether symbolic links are followed.
    #[must_use]
    pub fn with_follow_symlinks(mut self, follow: bool) -> Self {
        self.follow_symlinks = follow;
        self
    }

    /// Set whether hidden and temp-style names are skipped at walk time.
    #[must_use]
    pub fn with_skip_hidden(mut self, skip: bool) -> Self {
        self.skip_hidden = skip;
        self
    }
}

/// A file path paired with its content digest.
///
/// Produced by the hashing pool, consumed exactly once by the index.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FingerprintRecord {
    /// Absolute path of the fingerprinted file
    pub path: PathBuf,
    /// Hex-encoded content digest
    pub digest: Digest,
}

impl FingerprintRecord {
    /// Create a new record.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, digest: impl Into<Digest>) -> Self {
        Self {
            path: path.into(),
            digest: digest.into(),
        }
    }
}

/// Errors that can occur during directory scanning.
#[derive(thiserror::Error, Debug)]
pub enum ScanError {
    /// Permission was denied when reading a directory below the root.
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// The specified path was not found.
    #[error("Path not found: {0}")]
    NotFound(PathBuf),

    /// The specified path is not a directory.
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    /// An I/O error occurred while traversing the tree.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// A single file could not be fingerprinted.
    #[error(transparent)]
    HashError(#[from] HashError),
}

impl ScanError {
    /// Whether the scan can continue after this error.
    ///
    /// Permission failures on a subtree and per-file hashing failures are
    /// skipped and reported; everything else aborts the walk of that tree.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::PermissionDenied(_) | Self::HashError(_))
    }

    /// The path this error refers to.
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::PermissionDenied(path) | Self::NotFound(path) | Self::NotADirectory(path) => {
                path
            }
            Self::Io { path, .. } => path,
            Self::HashError(e) => e.path(),
        }
    }
}

/// Errors that can occur while fingerprinting a file.
#[derive(thiserror::Error, Debug)]
pub enum HashError {
    /// The specified file was not found.
    #[error("File not found: {0}")]
    NotFound(PathBuf),

    /// Permission was denied when reading the file.
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// The partial hash window does not fit inside the file.
    #[error("Partial hash size {partial} is invalid for {path} ({size} bytes)")]
    InvalidPartialRange {
        /// File being hashed
        path: PathBuf,
        /// File size in bytes
        size: u64,
        /// Configured partial hash size
        partial: u64,
    },

    /// An I/O error occurred while reading the file.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

impl HashError {
    /// Classify an I/O error raised while reading `path`.
    #[must_use]
    pub fn from_io(path: &Path, error: std::io::Error) -> Self {
        use std::io::ErrorKind;

        match error.kind() {
            ErrorKind::NotFound => Self::NotFound(path.to_path_buf()),
            ErrorKind::PermissionDenied => Self::PermissionDenied(path.to_path_buf()),
            _ => Self::Io {
                path: path.to_path_buf(),
                source: error,
            },
        }
    }

    /// The file this error refers to.
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::NotFound(path) | Self::PermissionDenied(path) => path,
            Self::InvalidPartialRange { path, .. } | Self::Io { path, .. } => path,
        }
    }
}
