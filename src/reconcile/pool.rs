//! Bounded worker pool turning walked paths into fingerprint records.
//!
//! # Overview
//!
//! ```text
//!  walker thread ──paths──▶ [bounded(W)] ──▶ W worker threads ──records──▶ [bounded(W)] ──▶ RecordStream
//! ```
//!
//! Both queues hold at most `W` items, so the walker can never run far ahead
//! of the workers. Each worker owns one clone of the record sender; the
//! record queue disconnects, and the [`RecordStream`] iterator ends, only
//! once every worker has drained the path queue and returned.
//!
//! Per path, a worker re-checks eligibility, consults the cache, and hashes
//! on a miss. A failed file is reported and skipped. Whatever happens, the
//! shared progress counter advances exactly once per path.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{bounded, Receiver, Sender};

use crate::cache::FingerprintCache;
use crate::progress::ProgressCallback;
use crate::scanner::{is_eligible, FingerprintRecord, Hasher, HashingPolicy, ScanError, Walker};

/// Default number of hashing workers.
pub const DEFAULT_WORKERS: usize = 4;

/// Counters gathered from the walker and workers of one pool run.
#[derive(Debug, Default)]
pub struct PoolStats {
    /// Files yielded by the walker
    pub walked: usize,
    /// Paths consumed by workers (always equals `walked` on completion)
    pub processed: usize,
    /// Records emitted
    pub fingerprinted: usize,
    /// Digests served from the cache
    pub cache_hits: usize,
    /// Digests computed because the cache had none
    pub cache_misses: usize,
    /// Paths rejected by the eligibility re-check
    pub filtered: usize,
    /// Files that could not be fingerprinted
    pub failed: usize,
    /// Subtrees skipped because of permission errors
    pub skipped_dirs: usize,
    /// Recoverable errors, in no particular order
    pub errors: Vec<ScanError>,
}

impl PoolStats {
    fn absorb(&mut self, worker: WorkerStats) {
        self.fingerprinted += worker.fingerprinted;
        self.cache_hits += worker.cache_hits;
        self.cache_misses += worker.cache_misses;
        self.filtered += worker.filtered;
        self.failed += worker.errors.len();
        self.errors.extend(worker.errors);
    }
}

#[derive(Debug, Default)]
struct WorkerStats {
    fingerprinted: usize,
    cache_hits: usize,
    cache_misses: usize,
    filtered: usize,
    errors: Vec<ScanError>,
}

#[derive(Debug, Default)]
struct WalkOutcome {
    walked: usize,
    skipped: Vec<ScanError>,
    fatal: Option<ScanError>,
}

/// State shared by all workers of one run.
struct WorkerContext {
    policy: Arc<HashingPolicy>,
    hasher: Hasher,
    cache: Arc<FingerprintCache>,
    progress: Arc<AtomicUsize>,
    progress_callback: Option<Arc<dyn ProgressCallback>>,
    phase: Arc<str>,
}

impl WorkerContext {
    fn run(&self, paths: Receiver<PathBuf>, records: Sender<FingerprintRecord>) -> WorkerStats {
        let mut stats = WorkerStats::default();

        for path in paths {
            let record = self.process(path.clone(), &mut stats);
            let delivered = record.map_or(true, |r| records.send(r).is_ok());
            self.advance(&path);
            if !delivered {
                log::debug!("[{}] Record consumer went away, worker stopping", self.phase);
                break;
            }
        }

        stats
    }

    fn process(&self, path: PathBuf, stats: &mut WorkerStats) -> Option<FingerprintRecord> {
        if !is_eligible(&path, &self.policy) {
            log::trace!("[{}] Not eligible: {}", self.phase, path.display());
            stats.filtered += 1;
            return None;
        }

        if let Some(digest) = self.cache.get(&path) {
            log::trace!("[{}] Cache hit: {}", self.phase, path.display());
            stats.cache_hits += 1;
            stats.fingerprinted += 1;
            return Some(FingerprintRecord { path, digest });
        }

        stats.cache_misses += 1;
        match self.hasher.fingerprint(&path) {
            Ok(digest) => {
                self.cache.set(path.clone(), digest.clone());
                stats.fingerprinted += 1;
                Some(FingerprintRecord { path, digest })
            }
            Err(e) => {
                log::warn!("[{}] Failed to fingerprint {}: {}", self.phase, path.display(), e);
                let err = ScanError::from(e);
                if let Some(ref callback) = self.progress_callback {
                    callback.on_error(&self.phase, &err);
                }
                stats.errors.push(err);
                None
            }
        }
    }

    fn advance(&self, path: &Path) {
        let current = self.progress.fetch_add(1, Ordering::Relaxed) + 1;
        if let Some(ref callback) = self.progress_callback {
            callback.on_progress(&self.phase, current, path.to_string_lossy().as_ref());
        }
    }
}

/// Fixed-size group of hashing workers fed by one tree walker.
///
/// # Example
///
/// ```no_run
/// use hashrecon::cache::FingerprintCache;
/// use hashrecon::reconcile::{FingerprintIndex, HashingPool};
/// use hashrecon::scanner::{HashingPolicy, Walker, WalkerConfig};
/// use std::path::Path;
/// use std::sync::Arc;
///
/// let policy = HashingPolicy::new([".txt"], Vec::<String>::new(), 1 << 20, 4096);
/// let pool = HashingPool::new(policy, Arc::new(FingerprintCache::new())).with_workers(8);
///
/// let mut stream = pool.spawn(Walker::new(Path::new("."), WalkerConfig::default())).unwrap();
/// let index: FingerprintIndex = stream.by_ref().collect();
/// let stats = stream.finish().unwrap();
/// println!("{} files, {} digests", stats.fingerprinted, index.digest_count());
/// ```
pub struct HashingPool {
    policy: Arc<HashingPolicy>,
    cache: Arc<FingerprintCache>,
    workers: usize,
    progress_callback: Option<Arc<dyn ProgressCallback>>,
    phase: Arc<str>,
}

impl std::fmt::Debug for HashingPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HashingPool")
            .field("policy", &self.policy)
            .field("cache_entries", &self.cache.len())
            .field("workers", &self.workers)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<callback>"),
            )
            .field("phase", &self.phase)
            .finish()
    }
}

impl HashingPool {
    /// Create a pool with [`DEFAULT_WORKERS`] workers.
    #[must_use]
    pub fn new(policy: HashingPolicy, cache: Arc<FingerprintCache>) -> Self {
        Self {
            policy: Arc::new(policy),
            cache,
            workers: DEFAULT_WORKERS,
            progress_callback: None,
            phase: Arc::from("scan"),
        }
    }

    /// Set the number of workers (at least one).
    #[must_use]
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Set the progress callback.
    #[must_use]
    pub fn with_progress_callback(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    /// Set the phase name used in progress reports and log lines.
    #[must_use]
    pub fn with_phase(mut self, phase: &str) -> Self {
        self.phase = Arc::from(phase);
        self
    }

    /// Number of workers this pool starts.
    #[must_use]
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Start walking and hashing; records arrive through the returned stream.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if a thread cannot be spawned. Threads that were
    /// already started shut down on their own once their queues disconnect.
    pub fn spawn(&self, walker: Walker) -> std::io::Result<RecordStream> {
        let (path_tx, path_rx) = bounded::<PathBuf>(self.workers);
        let (record_tx, record_rx) = bounded::<FingerprintRecord>(self.workers);
        let progress = Arc::new(AtomicUsize::new(0));

        let producer = {
            let callback = self.progress_callback.clone();
            let phase = Arc::clone(&self.phase);
            thread::Builder::new()
                .name(format!("{}-walker", self.phase))
                .spawn(move || {
                    walk_into(
                        walker.walk(),
                        walker.root(),
                        &path_tx,
                        callback.as_deref(),
                        &phase,
                    )
                })?
        };

        let mut workers = Vec::with_capacity(self.workers);
        for id in 0..self.workers {
            let ctx = WorkerContext {
                policy: Arc::clone(&self.policy),
                hasher: Hasher::from_policy(&self.policy),
                cache: Arc::clone(&self.cache),
                progress: Arc::clone(&progress),
                progress_callback: self.progress_callback.clone(),
                phase: Arc::clone(&self.phase),
            };
            let paths = path_rx.clone();
            let records = record_tx.clone();
            let handle = thread::Builder::new()
                .name(format!("{}-hash-{}", self.phase, id))
                .spawn(move || ctx.run(paths, records))?;
            workers.push(handle);
        }
        // Only workers may keep the record queue open
        drop(record_tx);

        log::debug!("[{}] Started {} hashing workers", self.phase, self.workers);

        Ok(RecordStream {
            records: record_rx,
            producer,
            workers,
            progress,
        })
    }
}

/// Feed walker output into the path queue until the walk ends or fails.
///
/// Recoverable entries are reported and recorded; the walk carries on past
/// them.
fn walk_into<I>(
    entries: I,
    root: &Path,
    paths: &Sender<PathBuf>,
    callback: Option<&dyn ProgressCallback>,
    phase: &str,
) -> WalkOutcome
where
    I: IntoIterator<Item = Result<PathBuf, ScanError>>,
{
    let mut outcome = WalkOutcome::default();

    for entry in entries {
        match entry {
            Ok(path) => {
                outcome.walked += 1;
                if paths.send(path).is_err() {
                    log::debug!("[{}] All workers gone, walker stopping", phase);
                    break;
                }
            }
            Err(e) if e.is_recoverable() => {
                if let Some(callback) = callback {
                    callback.on_error(phase, &e);
                }
                outcome.skipped.push(e);
            }
            Err(e) => {
                log::error!("[{}] Walk of {} aborted: {}", phase, root.display(), e);
                outcome.fatal = Some(e);
                break;
            }
        }
    }

    outcome
}

/// Lazy stream of fingerprint records from a running [`HashingPool`].
///
/// Iterate it to exhaustion, then call [`finish`](Self::finish) to join the
/// threads and learn whether the walk completed. Record order depends on
/// which worker finishes first and is not deterministic.
pub struct RecordStream {
    records: Receiver<FingerprintRecord>,
    producer: JoinHandle<WalkOutcome>,
    workers: Vec<JoinHandle<WorkerStats>>,
    progress: Arc<AtomicUsize>,
}

impl std::fmt::Debug for RecordStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordStream")
            .field("workers", &self.workers.len())
            .field("processed", &self.processed())
            .finish_non_exhaustive()
    }
}

impl Iterator for RecordStream {
    type Item = FingerprintRecord;

    fn next(&mut self) -> Option<Self::Item> {
        self.records.recv().ok()
    }
}

impl RecordStream {
    /// Paths consumed by workers so far.
    #[must_use]
    pub fn processed(&self) -> usize {
        self.progress.load(Ordering::Relaxed)
    }

    /// Join all threads and collect their statistics.
    ///
    /// Records not yet consumed are discarded.
    ///
    /// # Errors
    ///
    /// Returns the fatal [`ScanError`] that aborted the walk, if any.
    pub fn finish(self) -> Result<PoolStats, ScanError> {
        let Self {
            records,
            producer,
            workers,
            progress,
        } = self;
        drop(records);

        let mut stats = PoolStats::default();
        for handle in workers {
            match handle.join() {
                Ok(worker) => stats.absorb(worker),
                Err(_) => log::error!("Hashing worker panicked; its files are missing from the index"),
            }
        }

        let outcome = match producer.join() {
            Ok(outcome) => outcome,
            Err(_) => {
                log::error!("Walker thread panicked");
                WalkOutcome {
                    fatal: Some(ScanError::Io {
                        path: PathBuf::new(),
                        source: std::io::Error::other("walker thread panicked"),
                    }),
                    ..WalkOutcome::default()
                }
            }
        };

        if let Some(fatal) = outcome.fatal {
            return Err(fatal);
        }

        stats.walked = outcome.walked;
        stats.processed = progress.load(Ordering::Relaxed);
        stats.skipped_dirs = outcome.skipped.len();
        stats.errors.extend(outcome.skipped);
        Ok(stats)
    }
}
