//! Directory walker producing candidate file paths.
//!
//! # Overview
//!
//! [`Walker::walk`] is a lazy iterator over regular files below a root.
//! Nothing is collected up front, so memory stays flat on very large trees,
//! and every call starts a fresh traversal.
//!
//! # Error handling
//!
//! - A directory that cannot be read because of permissions, the root
//!   included, yields [`ScanError::PermissionDenied`]; its subtree is skipped
//!   and the walk carries on with its siblings. An unreadable root therefore
//!   walks as an empty tree.
//! - A missing root, and any other traversal failure (including symlink
//!   loops when following links), is fatal. The caller should stop
//!   consuming the iterator.
//!
//! # Symlinks
//!
//! Without `follow_symlinks`, a link to a regular file is yielded under the
//! link's own path and hashed through it, while links to directories are
//! never descended. With `follow_symlinks`, both are followed.
//!
//! # Example
//!
//! ```no_run
//! use hashrecon::scanner::{Walker, WalkerConfig};
//! use std::path::Path;
//!
//! let walker = Walker::new(Path::new("/mnt/archive"), WalkerConfig::default());
//! for entry in walker.walk() {
//!     match entry {
//!         Ok(path) => println!("{}", path.display()),
//!         Err(e) if e.is_recoverable() => eprintln!("Skipping: {}", e),
//!         Err(e) => {
//!             eprintln!("Walk aborted: {}", e);
//!             break;
//!         }
//!     }
//! }
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use walkdir::{DirEntry, WalkDir};

use super::filter::is_hidden_name;
use super::{ScanError, WalkerConfig};

/// Directory walker for lazy file discovery.
#[derive(Debug, Clone)]
pub struct Walker {
    /// Root path to walk
    root: PathBuf,
    /// Walker configuration
    config: WalkerConfig,
}

impl Walker {
    /// Create a new walker for the given path.
    #[must_use]
    pub fn new(path: &Path, config: WalkerConfig) -> Self {
        Self {
            root: path.to_path_buf(),
            config,
        }
    }

    /// The root this walker starts from.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Walk the directory tree, yielding regular file paths.
    ///
    /// Directories are never yielded. Symlinks to regular files are always
    /// yielded; symlinked directories are descended only when
    /// `follow_symlinks` is set. Hidden and temp names are skipped when
    /// `skip_hidden` is set.
    pub fn walk(&self) -> impl Iterator<Item = Result<PathBuf, ScanError>> + '_ {
        WalkDir::new(&self.root)
            .follow_links(self.config.follow_symlinks)
            .into_iter()
            .filter_map(move |entry_result| match entry_result {
                Ok(entry) => {
                    let file_type = entry.file_type();
                    if file_type.is_dir() {
                        return None;
                    }

                    if !file_type.is_file() && !is_link_to_file(&entry) {
                        log::trace!("Skipping non-regular file: {}", entry.path().display());
                        return None;
                    }

                    if self.config.skip_hidden && is_hidden_name(entry.path()) {
                        log::trace!("Skipping hidden file: {}", entry.path().display());
                        return None;
                    }

                    Some(Ok(entry.into_path()))
                }
                Err(e) => Some(Err(self.handle_walk_error(e))),
            })
    }

    /// Count the files a full walk would yield.
    ///
    /// Recoverable errors are skipped silently; the real walk reports them.
    ///
    /// # Errors
    ///
    /// Returns the first fatal [`ScanError`].
    pub fn count_files(&self) -> Result<usize, ScanError> {
        let mut count = 0;
        for entry in self.walk() {
            match entry {
                Ok(_) => count += 1,
                Err(e) if e.is_recoverable() => {}
                Err(e) => return Err(e),
            }
        }
        Ok(count)
    }

    /// Classify a walkdir error as recoverable or fatal.
    fn handle_walk_error(&self, error: walkdir::Error) -> ScanError {
        let path = error
            .path()
            .map_or_else(|| self.root.clone(), Path::to_path_buf);
        let at_root = error.depth() == 0 || path == self.root;
        log::debug!("Walk error for {}: {}", path.display(), error);

        classify_walk_error(path, at_root, io::Error::from(error))
    }
}

/// Whether an unfollowed symlink entry points at a regular file.
fn is_link_to_file(entry: &DirEntry) -> bool {
    entry.path_is_symlink()
        && fs::metadata(entry.path()).is_ok_and(|meta| meta.is_file())
}

/// Permission problems skip one subtree, wherever they happen; a missing
/// root is reported as such; everything else is fatal.
fn classify_walk_error(path: PathBuf, at_root: bool, error: io::Error) -> ScanError {
    match error.kind() {
        io::ErrorKind::PermissionDenied => {
            log::warn!("Permission denied, skipping subtree: {}", path.display());
            ScanError::PermissionDenied(path)
        }
        io::ErrorKind::NotFound if at_root => ScanError::NotFound(path),
        _ => ScanError::Io {
            path,
            source: error,
        },
    }
}
