//! One-way reconciliation of a source tree against a target tree.
//!
//! # Overview
//!
//! Reconciliation runs the same pipeline once per tree:
//! 1. **Walk** - Lazily list candidate files below the root ([`crate::scanner::Walker`])
//! 2. **Fingerprint** - Hash them on a bounded worker pool, cache first ([`pool`])
//! 3. **Index** - Group the resulting records by digest ([`index`])
//!
//! and then one diff ([`diff`]): every source file whose digest occurs
//! nowhere in the target is missing. Names and locations never matter.
//!
//! # Example
//!
//! ```no_run
//! use hashrecon::cache::FingerprintCache;
//! use hashrecon::reconcile::{ReconcileConfig, Reconciler};
//! use hashrecon::scanner::HashingPolicy;
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! let policy = HashingPolicy::new([".jpg", ".mov"], Vec::<String>::new(), 100 << 20, 1 << 20);
//! let reconciler = Reconciler::new(ReconcileConfig::new(policy).with_workers(4));
//!
//! let report = reconciler
//!     .reconcile(
//!         Path::new("/photos"),
//!         Path::new("/mnt/backup/photos"),
//!         Arc::new(FingerprintCache::new()),
//!         Arc::new(FingerprintCache::new()),
//!     )
//!     .unwrap();
//!
//! for path in &report.missing {
//!     println!("not backed up: {}", path.display());
//! }
//! ```

pub mod diff;
pub mod index;
pub mod pool;

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::cache::FingerprintCache;
use crate::progress::ProgressCallback;
use crate::scanner::{HashingPolicy, ScanError, Walker, WalkerConfig};

pub use diff::{missing, MissingFileSet};
pub use index::FingerprintIndex;
pub use pool::{HashingPool, PoolStats, RecordStream, DEFAULT_WORKERS};

/// Which of the two trees a result or error belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TreeSide {
    /// The tree whose files must be accounted for
    Source,
    /// The tree searched for copies
    Target,
}

impl TreeSide {
    /// Lowercase name, also used as the progress phase name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Source => "source",
            Self::Target => "target",
        }
    }
}

impl fmt::Display for TreeSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Configuration for the reconciler.
#[derive(Clone)]
pub struct ReconcileConfig {
    /// Which files are hashed and how.
    pub policy: HashingPolicy,
    /// Hashing workers per tree.
    /// Default is 4 to prevent disk thrashing.
    pub workers: usize,
    /// Walker configuration for directory traversal.
    pub walker_config: WalkerConfig,
    /// Optional progress callback for reporting.
    pub progress_callback: Option<Arc<dyn ProgressCallback>>,
    /// Scan both trees at the same time instead of one after the other.
    pub parallel_trees: bool,
    /// Count files before hashing so progress has a known total.
    pub precount: bool,
}

impl fmt::Debug for ReconcileConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReconcileConfig")
            .field("policy", &self.policy)
            .field("workers", &self.workers)
            .field("walker_config", &self.walker_config)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<callback>"),
            )
            .field("parallel_trees", &self.parallel_trees)
            .field("precount", &self.precount)
            .finish()
    }
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self::new(HashingPolicy::default())
    }
}

impl ReconcileConfig {
    /// Create a configuration around a hashing policy.
    #[must_use]
    pub fn new(policy: HashingPolicy) -> Self {
        Self {
            policy,
            workers: DEFAULT_WORKERS,
            walker_config: WalkerConfig::default(),
            progress_callback: None,
            parallel_trees: false,
            precount: true,
        }
    }

    /// Set the number of hashing workers per tree (at least one).
    #[must_use]
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Set the walker configuration.
    #[must_use]
    pub fn with_walker_config(mut self, config: WalkerConfig) -> Self {
        self.walker_config = config;
        self
    }

    /// Set the progress callback.
    #[must_use]
    pub fn with_progress_callback(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    /// Scan both trees concurrently.
    #[must_use]
    pub fn with_parallel_trees(mut self, enabled: bool) -> Self {
        self.parallel_trees = enabled;
        self
    }

    /// Enable or disable the counting walk that sizes the progress bar.
    #[must_use]
    pub fn with_precount(mut self, enabled: bool) -> Self {
        self.precount = enabled;
        self
    }
}

/// Statistics for one scanned tree.
#[derive(Debug, Default)]
pub struct TreeSummary {
    /// Canonical root of the tree
    pub root: PathBuf,
    /// Files yielded by the walk
    pub files_walked: usize,
    /// Files that ended up in the index
    pub files_fingerprinted: usize,
    /// Distinct digests in the index
    pub distinct_digests: usize,
    /// Digests served from the cache
    pub cache_hits: usize,
    /// Digests computed from file content
    pub cache_misses: usize,
    /// Files rejected by the extension filter
    pub filtered: usize,
    /// Files that could not be fingerprinted
    pub failed_files: usize,
    /// Subtrees skipped because of permission errors
    pub skipped_dirs: usize,
    /// Recoverable errors met along the way
    pub errors: Vec<ScanError>,
    /// Time spent on this tree
    pub duration: Duration,
}

impl TreeSummary {
    fn from_stats(root: PathBuf, index: &FingerprintIndex, stats: PoolStats, duration: Duration) -> Self {
        Self {
            root,
            files_walked: stats.walked,
            files_fingerprinted: index.file_count(),
            distinct_digests: index.digest_count(),
            cache_hits: stats.cache_hits,
            cache_misses: stats.cache_misses,
            filtered: stats.filtered,
            failed_files: stats.failed,
            skipped_dirs: stats.skipped_dirs,
            errors: stats.errors,
            duration,
        }
    }
}

/// Outcome of reconciling a source tree against a target tree.
#[derive(Debug, Default)]
pub struct ReconcileReport {
    /// Source files with no content match in the target
    pub missing: MissingFileSet,
    /// Source tree statistics
    pub source: TreeSummary,
    /// Target tree statistics
    pub target: TreeSummary,
    /// Wall-clock time of the whole run
    pub duration: Duration,
}

impl ReconcileReport {
    /// Number of missing source files.
    #[must_use]
    pub fn missing_count(&self) -> usize {
        self.missing.len()
    }

    /// Whether any file or subtree was skipped in either tree.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.error_count() > 0
    }

    /// Recoverable errors across both trees.
    #[must_use]
    pub fn error_count(&self) -> usize {
        self.source.errors.len() + self.target.errors.len()
    }

    /// Whether every source file has a counterpart.
    #[must_use]
    pub fn is_reconciled(&self) -> bool {
        self.missing.is_empty()
    }
}

/// Errors that abort a reconciliation.
#[derive(thiserror::Error, Debug)]
pub enum ReconcileError {
    /// A tree could not be walked.
    #[error("{side} tree: {source}")]
    Tree {
        /// The tree that failed
        side: TreeSide,
        /// What went wrong
        #[source]
        source: ScanError,
    },

    /// Worker threads could not be started.
    #[error("{side} tree: failed to start worker threads: {source}")]
    Spawn {
        /// The tree being scanned
        side: TreeSide,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

impl ReconcileError {
    /// The tree this error belongs to.
    #[must_use]
    pub fn side(&self) -> TreeSide {
        match self {
            Self::Tree { side, .. } | Self::Spawn { side, .. } => *side,
        }
    }
}

/// Reconciler that runs the per-tree pipelines and the diff.
#[derive(Debug, Clone)]
pub struct Reconciler {
    config: ReconcileConfig,
}

impl Reconciler {
    /// Create a new reconciler with the given configuration.
    #[must_use]
    pub fn new(config: ReconcileConfig) -> Self {
        Self { config }
    }

    /// The configuration in use.
    #[must_use]
    pub fn config(&self) -> &ReconcileConfig {
        &self.config
    }

    /// Fingerprint every eligible file below `root` into an index.
    ///
    /// # Errors
    ///
    /// Returns [`ReconcileError::Tree`] if the root is missing, is not a
    /// directory, or the walk hits a fatal error, and
    /// [`ReconcileError::Spawn`] if threads cannot be started.
    pub fn scan_tree(
        &self,
        side: TreeSide,
        root: &Path,
        cache: Arc<FingerprintCache>,
    ) -> Result<(FingerprintIndex, TreeSummary), ReconcileError> {
        let start = Instant::now();
        let tree_err = |source: ScanError| ReconcileError::Tree { side, source };

        let root = validate_root(root).map_err(tree_err)?;
        log::info!("Scanning {} tree {}", side, root.display());

        let walker = Walker::new(&root, self.config.walker_config.clone());
        let phase = side.as_str();

        let total = match self.config.progress_callback {
            Some(ref callback) if self.config.precount => {
                callback.on_message(&format!("Counting files in {} tree...", side));
                walker.count_files().map_err(tree_err)?
            }
            _ => 0,
        };

        if let Some(ref callback) = self.config.progress_callback {
            callback.on_phase_start(phase, total);
        }

        let mut pool = HashingPool::new(self.config.policy.clone(), cache)
            .with_workers(self.config.workers)
            .with_phase(phase);
        if let Some(ref callback) = self.config.progress_callback {
            pool = pool.with_progress_callback(Arc::clone(callback));
        }

        let mut stream = pool
            .spawn(walker)
            .map_err(|source| ReconcileError::Spawn { side, source })?;
        let index: FingerprintIndex = stream.by_ref().collect();
        let result = stream.finish();

        if let Some(ref callback) = self.config.progress_callback {
            callback.on_phase_end(phase);
        }

        let stats = result.map_err(tree_err)?;
        let summary = TreeSummary::from_stats(root, &index, stats, start.elapsed());

        log::info!(
            "{} tree: {} files fingerprinted ({} distinct), {} cache hits, {} failed, {} dirs skipped",
            side,
            summary.files_fingerprinted,
            summary.distinct_digests,
            summary.cache_hits,
            summary.failed_files,
            summary.skipped_dirs
        );
        if log::log_enabled!(log::Level::Debug) {
            let copies = index.duplicate_groups().count();
            log::debug!("{} tree: {} digests shared by several files", side, copies);
        }

        Ok((index, summary))
    }

    /// Find the source files whose content is absent from the target.
    ///
    /// Each tree gets its own cache. The caches are only read and extended;
    /// saving them is up to the caller.
    ///
    /// # Errors
    ///
    /// Returns the first [`ReconcileError`], source tree first. Recoverable
    /// errors do not fail the run; they are listed in the report.
    pub fn reconcile(
        &self,
        source: &Path,
        target: &Path,
        source_cache: Arc<FingerprintCache>,
        target_cache: Arc<FingerprintCache>,
    ) -> Result<ReconcileReport, ReconcileError> {
        let start = Instant::now();

        let (source_result, target_result) = if self.config.parallel_trees {
            rayon::join(
                || self.scan_tree(TreeSide::Source, source, source_cache),
                || self.scan_tree(TreeSide::Target, target, target_cache),
            )
        } else {
            // No point walking the target when the source already failed
            let source_scan = self.scan_tree(TreeSide::Source, source, source_cache)?;
            (
                Ok(source_scan),
                self.scan_tree(TreeSide::Target, target, target_cache),
            )
        };

        let (source_index, source_summary) = source_result?;
        let (target_index, target_summary) = target_result?;

        let missing = diff::missing(&source_index, &target_index);
        log::info!(
            "{} of {} source files have no copy in the target",
            missing.len(),
            source_summary.files_fingerprinted
        );

        Ok(ReconcileReport {
            missing,
            source: source_summary,
            target: target_summary,
            duration: start.elapsed(),
        })
    }
}

/// Check that `root` is an existing directory and make it absolute.
///
/// A root hidden behind a parent without search permission cannot be
/// inspected; it is passed on as given so the walk reports it as a skipped
/// subtree.
fn validate_root(root: &Path) -> Result<PathBuf, ScanError> {
    let io_err = |source: io::Error| ScanError::Io {
        path: root.to_path_buf(),
        source,
    };

    match fs::metadata(root) {
        Ok(meta) if meta.is_dir() => root.canonicalize().map_err(io_err),
        Ok(_) => Err(ScanError::NotADirectory(root.to_path_buf())),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            Err(ScanError::NotFound(root.to_path_buf()))
        }
        Err(e) if e.kind() == io::ErrorKind::PermissionDenied => {
            log::warn!("Cannot inspect {}: {}", root.display(), e);
            std::path::absolute(root).map_err(io_err)
        }
        Err(e) => Err(io_err(e)),
    }
}
