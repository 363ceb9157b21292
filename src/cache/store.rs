//! JSON-backed fingerprint cache.

use std::collections::{BTreeMap, HashMap};
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

use thiserror::Error;

use crate::scanner::Digest;

/// Errors raised while loading or saving the cache file.
#[derive(Debug, Error)]
pub enum CacheError {
    /// The cache file could not be read or written.
    #[error("Cache I/O error for {path}: {source}")]
    Io {
        /// Cache file path
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },

    /// The cache file is not a JSON object of path to digest.
    #[error("Cache file {path} is corrupt: {source}")]
    Corrupt {
        /// Cache file path
        path: PathBuf,
        /// The underlying parse error
        #[source]
        source: serde_json::Error,
    },
}

/// Result alias for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;

/// Thread-safe mapping from absolute path to digest.
///
/// Reads take a shared lock, writes an exclusive one. The map itself is
/// never handed out; callers only see [`get`](Self::get) and
/// [`set`](Self::set), so nobody iterates it while workers insert.
#[derive(Debug, Default)]
pub struct FingerprintCache {
    entries: RwLock<HashMap<PathBuf, Digest>>,
}

impl FingerprintCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a cache pre-filled with `entries`.
    #[must_use]
    pub fn from_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (PathBuf, Digest)>,
    {
        Self {
            entries: RwLock::new(entries.into_iter().collect()),
        }
    }

    /// Look up the digest previously stored for `path`.
    #[must_use]
    pub fn get(&self, path: &Path) -> Option<Digest> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(path)
            .cloned()
    }

    /// Store the digest for `path`, replacing any previous value.
    pub fn set(&self, path: PathBuf, digest: Digest) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(path, digest);
    }

    /// Number of cached entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether the cache holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Load a cache from `path`.
    ///
    /// A missing file is not an error and yields an empty cache.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] if the file exists but cannot be read or parsed.
    pub fn load(path: &Path) -> CacheResult<Self> {
        let file = match File::open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                log::debug!("No cache at {}, starting empty", path.display());
                return Ok(Self::new());
            }
            Err(e) => {
                return Err(CacheError::Io {
                    path: path.to_path_buf(),
                    source: e,
                })
            }
        };

        let raw: HashMap<String, Digest> = serde_json::from_reader(BufReader::new(file))
            .map_err(|e| CacheError::Corrupt {
                path: path.to_path_buf(),
                source: e,
            })?;

        log::debug!("Loaded {} cached digests from {}", raw.len(), path.display());
        Ok(Self::from_entries(
            raw.into_iter().map(|(k, v)| (PathBuf::from(k), v)),
        ))
    }

    /// Load a cache from `path`, falling back to an empty cache on any error.
    ///
    /// Load failures are logged, never propagated: the cache only saves time.
    #[must_use]
    pub fn load_or_empty(path: &Path) -> Self {
        match Self::load(path) {
            Ok(cache) => cache,
            Err(e) => {
                log::warn!("{}; continuing with an empty cache", e);
                Self::new()
            }
        }
    }

    /// Write the full cache to `path`.
    ///
    /// The file is written next to its destination and renamed into place,
    /// so an interrupted save never leaves a truncated cache behind. Paths
    /// that are not valid UTF-8 cannot be stored in JSON and are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Io`] if the file cannot be written.
    pub fn save(&self, path: &Path) -> CacheResult<()> {
        let io_err = |source: io::Error| CacheError::Io {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_err)?;
        }

        let snapshot: BTreeMap<String, Digest> = {
            let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
            entries
                .iter()
                .filter_map(|(p, d)| match p.to_str() {
                    Some(s) => Some((s.to_string(), d.clone())),
                    None => {
                        log::debug!("Not caching non-UTF-8 path: {}", p.display());
                        None
                    }
                })
                .collect()
        };

        let tmp_path = path.with_extension("json.tmp");
        {
            let mut writer = BufWriter::new(File::create(&tmp_path).map_err(io_err)?);
            serde_json::to_writer(&mut writer, &snapshot)
                .map_err(|e| io_err(io::Error::from(e)))?;
            writer.flush().map_err(io_err)?;
        }
        fs::rename(&tmp_path, path).map_err(io_err)?;

        log::debug!("Saved {} cached digests to {}", snapshot.len(), path.display());
        Ok(())
    }
}
