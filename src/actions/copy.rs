//! Copy missing source files into the target tree.
//!
//! # Overview
//!
//! Every file is copied to `<target>/missed_files/<path relative to source>`,
//! so the source layout is kept under one folder that is easy to review and
//! move into place. Contents and permissions are copied by [`fs::copy`];
//! access and modification times are carried over afterwards.
//!
//! A failed file is logged and recorded, and the batch carries on with the
//! next one. Existing files at the destination are overwritten.
//!
//! # Example
//!
//! ```no_run
//! use hashrecon::actions::copy::copy_one;
//! use std::path::Path;
//!
//! let copied = copy_one(
//!     Path::new("/photos/2019/beach.jpg"),
//!     Path::new("/photos"),
//!     Path::new("/mnt/backup/missed_files"),
//! );
//! match copied {
//!     Ok(result) => println!("Copied to {}", result.destination.display()),
//!     Err(e) => eprintln!("Failed: {}", e),
//! }
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use filetime::FileTime;
use thiserror::Error;

use crate::progress::ProgressCallback;

/// Folder below the target root that receives the copies.
pub const MISSED_FILES_DIR: &str = "missed_files";

/// Progress phase name used while copying.
pub const COPY_PHASE: &str = "copy";

/// Error type for copy operations.
#[derive(Debug, Error)]
pub enum CopyError {
    /// The file does not live below the source root, so it has no
    /// relative destination.
    #[error("{path} is not inside source tree {root}")]
    OutsideSource { path: PathBuf, root: PathBuf },

    /// General I/O error.
    #[error("I/O error for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl CopyError {
    /// Get the path associated with this error.
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::OutsideSource { path, .. } | Self::Io { path, .. } => path,
        }
    }

    fn io(path: &Path, source: io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Result of a successful copy.
#[derive(Debug, Clone)]
pub struct CopyResult {
    /// File that was copied.
    pub source: PathBuf,
    /// Where it was copied to.
    pub destination: PathBuf,
    /// Bytes copied.
    pub size: u64,
}

/// Results of a batch copy.
#[derive(Debug, Default)]
pub struct BatchCopyResult {
    /// Successfully copied files.
    pub successes: Vec<CopyResult>,
    /// Files that could not be copied.
    pub failures: Vec<CopyError>,
    /// Total bytes copied.
    pub bytes_copied: u64,
}

impl BatchCopyResult {
    /// Number of files copied.
    #[must_use]
    pub fn success_count(&self) -> usize {
        self.successes.len()
    }

    /// Number of files that failed.
    #[must_use]
    pub fn failure_count(&self) -> usize {
        self.failures.len()
    }

    /// Total number of attempted copies.
    #[must_use]
    pub fn total_count(&self) -> usize {
        self.successes.len() + self.failures.len()
    }

    /// Check if every copy succeeded.
    #[must_use]
    pub fn all_succeeded(&self) -> bool {
        self.failures.is_empty()
    }

    /// Human-readable summary of the operation.
    #[must_use]
    pub fn summary(&self) -> String {
        if self.all_succeeded() {
            format!(
                "Copied {} file(s), {} bytes",
                self.success_count(),
                self.bytes_copied
            )
        } else {
            format!(
                "Copied {} file(s), {} failed, {} bytes",
                self.success_count(),
                self.failure_count(),
                self.bytes_copied
            )
        }
    }
}

/// Where `file` lands below `dest_root`, keeping its path relative to
/// `source_root`.
///
/// # Errors
///
/// Returns `OutsideSource` if `file` is not below `source_root`.
///
/// # Example
///
/// ```
/// use hashrecon::actions::copy::destination_for;
/// use std::path::{Path, PathBuf};
///
/// let dest = destination_for(
///     Path::new("/photos/2019/beach.jpg"),
///     Path::new("/photos"),
///     Path::new("/backup/missed_files"),
/// )
/// .unwrap();
/// assert_eq!(dest, PathBuf::from("/backup/missed_files/2019/beach.jpg"));
/// ```
pub fn destination_for(file: &Path, source_root: &Path, dest_root: &Path) -> Result<PathBuf, CopyError> {
    match file.strip_prefix(source_root) {
        Ok(rel) if !rel.as_os_str().is_empty() => Ok(dest_root.join(rel)),
        _ => Err(CopyError::OutsideSource {
            path: file.to_path_buf(),
            root: source_root.to_path_buf(),
        }),
    }
}

/// Copy one file below `dest_root`, creating parent folders and keeping its
/// timestamps.
///
/// # Errors
///
/// Returns `OutsideSource` for a file outside `source_root` and `Io` for
/// any filesystem failure.
pub fn copy_one(file: &Path, source_root: &Path, dest_root: &Path) -> Result<CopyResult, CopyError> {
    let destination = destination_for(file, source_root, dest_root)?;

    let meta = fs::metadata(file).map_err(|e| CopyError::io(file, e))?;
    if let Some(parent) = destination.parent() {
        fs::create_dir_all(parent).map_err(|e| CopyError::io(parent, e))?;
    }
    let size = fs::copy(file, &destination).map_err(|e| CopyError::io(file, e))?;

    filetime::set_file_times(
        &destination,
        FileTime::from_last_access_time(&meta),
        FileTime::from_last_modification_time(&meta),
    )
    .map_err(|e| CopyError::io(&destination, e))?;

    log::trace!("Copied {} -> {}", file.display(), destination.display());
    Ok(CopyResult {
        source: file.to_path_buf(),
        destination,
        size,
    })
}

/// Copy every file in `files` to `<target_root>/missed_files/`, keeping
/// paths relative to `source_root`.
///
/// Files may be given relative to `source_root` as passed in or to its
/// canonical form; reconciliation reports use the latter. One failure never
/// stops the batch.
///
/// # Arguments
///
/// * `files` - Source files to copy
/// * `source_root` - Root the relative layout is taken from
/// * `target_root` - Tree receiving the `missed_files` folder
/// * `callback` - Optional progress reporting, phase [`COPY_PHASE`]
pub fn copy_missing(
    files: &[PathBuf],
    source_root: &Path,
    target_root: &Path,
    callback: Option<&dyn ProgressCallback>,
) -> BatchCopyResult {
    let dest_root = target_root.join(MISSED_FILES_DIR);
    let canonical_root = source_root
        .canonicalize()
        .unwrap_or_else(|_| source_root.to_path_buf());
    let mut result = BatchCopyResult::default();

    log::info!(
        "Copying {} file(s) to {}",
        files.len(),
        dest_root.display()
    );
    if let Some(cb) = callback {
        cb.on_phase_start(COPY_PHASE, files.len());
    }

    for (index, file) in files.iter().enumerate() {
        let root = if file.starts_with(&canonical_root) {
            canonical_root.as_path()
        } else {
            source_root
        };

        match copy_one(file, root, &dest_root) {
            Ok(copied) => {
                result.bytes_copied += copied.size;
                result.successes.push(copied);
            }
            Err(e) => {
                log::warn!("Failed to copy {}: {}", file.display(), e);
                if let Some(cb) = callback {
                    cb.on_message(&format!("[{COPY_PHASE}] warning: {e}"));
                }
                result.failures.push(e);
            }
        }

        if let Some(cb) = callback {
            cb.on_progress(COPY_PHASE, index + 1, &file.to_string_lossy());
        }
    }

    if let Some(cb) = callback {
        cb.on_phase_end(COPY_PHASE);
    }
    log::info!("{}", result.summary());

    result
}
