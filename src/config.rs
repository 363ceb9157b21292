//! Application configuration management.
//!
//! Settings are layered with figment, lowest priority first:
//!
//! 1. Built-in defaults ([`Settings::default`])
//! 2. A TOML file (`--config`, or `config.toml` in the platform config dir)
//! 3. Environment variables prefixed `HASHRECON_`, `__` separating sections
//!    (`HASHRECON_HASHING__WORKERS=8`)
//! 4. Command-line flags, applied by [`crate::cli::Cli::apply_to`]
//!
//! # Example file
//!
//! ```toml
//! [directories]
//! source_dir = "/photos"
//! target_dir = "/mnt/backup/photos"
//!
//! [file_types]
//! included_extensions = [".jpg", ".png", ".mov"]
//! excluded_extensions = [".tmp"]
//!
//! [hashing]
//! large_file_threshold = 104857600
//! partial_hash_size = 1048576
//! workers = 4
//! ```

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::reconcile::{ReconcileConfig, TreeSide, DEFAULT_WORKERS};
use crate::scanner::{
    HashingPolicy, WalkerConfig, DEFAULT_LARGE_FILE_THRESHOLD, DEFAULT_PARTIAL_HASH_SIZE,
};

/// Prefix of environment variables read into [`Settings`].
pub const ENV_PREFIX: &str = "HASHRECON_";

/// Default report file name.
pub const DEFAULT_REPORT_FILE: &str = "missing_files.csv";

/// Cache file name for the source tree.
pub const SOURCE_CACHE_FILE: &str = "source_cache.json";

/// Cache file name for the target tree.
pub const TARGET_CACHE_FILE: &str = "target_cache.json";

/// Report file format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    /// One `File Path` column
    #[default]
    Csv,
    /// Missing paths plus per-tree statistics
    Json,
}

/// Trees to reconcile.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DirectorySettings {
    /// Tree whose files must be accounted for
    pub source_dir: Option<PathBuf>,
    /// Tree searched for copies
    pub target_dir: Option<PathBuf>,
}

/// Extension filters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileTypeSettings {
    /// Extensions to hash, e.g. `".jpg"`
    pub included_extensions: Vec<String>,
    /// Extensions never hashed, even when included
    pub excluded_extensions: Vec<String>,
}

/// Hashing and pipeline tuning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HashingSettings {
    /// Files strictly larger than this are hashed head+tail only
    pub large_file_threshold: u64,
    /// Bytes hashed from each end of a large file
    pub partial_hash_size: u64,
    /// Hashing workers per tree
    pub workers: usize,
    /// Follow symbolic links while walking
    pub follow_symlinks: bool,
    /// Scan source and target at the same time
    pub parallel_trees: bool,
    /// Count files first so progress bars have a total
    pub precount: bool,
}

impl Default for HashingSettings {
    fn default() -> Self {
        Self {
            large_file_threshold: DEFAULT_LARGE_FILE_THRESHOLD,
            partial_hash_size: DEFAULT_PARTIAL_HASH_SIZE,
            workers: DEFAULT_WORKERS,
            follow_symlinks: false,
            parallel_trees: false,
            precount: true,
        }
    }
}

/// Fingerprint cache persistence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    /// Load and save the per-tree caches
    pub enabled: bool,
    /// Directory holding the cache files; platform cache dir when unset
    pub dir: Option<PathBuf>,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            dir: None,
        }
    }
}

/// Report destination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSettings {
    /// Report file
    pub path: PathBuf,
    /// Report format
    pub format: ReportFormat,
    /// Sort missing paths before writing
    pub sort: bool,
    /// Copy missing files to `<target>/missed_files` after the report
    pub copy_missing: bool,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_REPORT_FILE),
            format: ReportFormat::Csv,
            sort: false,
            copy_missing: false,
        }
    }
}

/// Fully merged application settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// `[directories]`
    pub directories: DirectorySettings,
    /// `[file_types]`
    pub file_types: FileTypeSettings,
    /// `[hashing]`
    pub hashing: HashingSettings,
    /// `[cache]`
    pub cache: CacheSettings,
    /// `[output]`
    pub output: OutputSettings,
}

/// Configuration problems detected before any file is touched.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// The configuration sources could not be merged or parsed.
    #[error("Invalid configuration: {0}")]
    Figment(#[from] Box<figment::Error>),

    /// A tree root was not given.
    #[error("No {0} directory configured (pass it on the command line or set directories.{0}_dir)")]
    MissingDirectory(TreeSide),

    /// Nothing would be hashed.
    #[error("No file extensions to include (use --include or set file_types.included_extensions)")]
    NoExtensions,

    /// Zero workers requested.
    #[error("Worker count must be at least 1")]
    NoWorkers,

    /// The partial hash window is unusable.
    #[error("partial_hash_size ({partial}) must be greater than 0 and at most large_file_threshold ({threshold})")]
    InvalidPartialSize {
        /// Configured partial hash size
        partial: u64,
        /// Configured large file threshold
        threshold: u64,
    },
}

/// Known keys per section, for typo suggestions.
const KNOWN_KEYS: &[(&str, &[&str])] = &[
    ("directories", &["source_dir", "target_dir"]),
    ("file_types", &["included_extensions", "excluded_extensions"]),
    (
        "hashing",
        &[
            "large_file_threshold",
            "partial_hash_size",
            "workers",
            "follow_symlinks",
            "parallel_trees",
            "precount",
        ],
    ),
    ("cache", &["enabled", "dir"]),
    ("output", &["path", "format", "sort", "copy_missing"]),
];

impl Settings {
    /// Default configuration file location.
    #[must_use]
    pub fn default_config_path() -> Option<PathBuf> {
        project_dirs().map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Build the figment for defaults, the TOML file and the environment.
    ///
    /// An explicit `config_path` is used as given; otherwise the default
    /// location is merged when it exists.
    #[must_use]
    pub fn figment(config_path: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        let file = config_path
            .map(Path::to_path_buf)
            .or_else(|| Self::default_config_path().filter(|p| p.exists()));
        if let Some(path) = file {
            log::debug!("Loading configuration from {}", path.display());
            warn_unknown_keys(&path);
            figment = figment.merge(Toml::file(path));
        }

        figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Load settings from defaults, the TOML file and the environment.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::Figment`] if a source has the wrong shape.
    pub fn load(config_path: Option<&Path>) -> Result<Self, SettingsError> {
        Self::figment(config_path)
            .extract()
            .map_err(|e| SettingsError::Figment(Box::new(e)))
    }

    /// Check the merged settings for a runnable configuration.
    ///
    /// # Errors
    ///
    /// Returns the first problem found.
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.directories.source_dir.is_none() {
            return Err(SettingsError::MissingDirectory(TreeSide::Source));
        }
        if self.directories.target_dir.is_none() {
            return Err(SettingsError::MissingDirectory(TreeSide::Target));
        }
        if self.hashing_policy().included_extensions.is_empty() {
            return Err(SettingsError::NoExtensions);
        }
        if self.hashing.workers == 0 {
            return Err(SettingsError::NoWorkers);
        }
        let (partial, threshold) = (
            self.hashing.partial_hash_size,
            self.hashing.large_file_threshold,
        );
        if partial == 0 || partial > threshold {
            return Err(SettingsError::InvalidPartialSize { partial, threshold });
        }
        Ok(())
    }

    /// The hashing policy these settings describe.
    #[must_use]
    pub fn hashing_policy(&self) -> HashingPolicy {
        HashingPolicy::new(
            &self.file_types.included_extensions,
            &self.file_types.excluded_extensions,
            self.hashing.large_file_threshold,
            self.hashing.partial_hash_size,
        )
    }

    /// Reconciler configuration, without a progress callback.
    #[must_use]
    pub fn reconcile_config(&self) -> ReconcileConfig {
        ReconcileConfig::new(self.hashing_policy())
            .with_workers(self.hashing.workers)
            .with_walker_config(
                WalkerConfig::default().with_follow_symlinks(self.hashing.follow_symlinks),
            )
            .with_parallel_trees(self.hashing.parallel_trees)
            .with_precount(self.hashing.precount)
    }

    /// Directory holding the cache files.
    ///
    /// Falls back to the working directory when the platform offers no
    /// cache location.
    #[must_use]
    pub fn cache_dir(&self) -> PathBuf {
        self.cache
            .dir
            .clone()
            .or_else(|| project_dirs().map(|dirs| dirs.cache_dir().to_path_buf()))
            .unwrap_or_else(|| PathBuf::from("."))
    }

    /// Cache file paths for the source and target trees.
    #[must_use]
    pub fn cache_paths(&self) -> (PathBuf, PathBuf) {
        let dir = self.cache_dir();
        (dir.join(SOURCE_CACHE_FILE), dir.join(TARGET_CACHE_FILE))
    }

    /// Render as TOML, as accepted by `--config`.
    ///
    /// # Errors
    ///
    /// Returns an error if a value cannot be represented in TOML.
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "hashrecon", "hashrecon")
}

/// Log a warning for every key in `path` that settings do not know.
///
/// Figment ignores unknown keys silently, which hides typos. Parse errors
/// are left for figment to report.
fn warn_unknown_keys(path: &Path) {
    let Ok(content) = std::fs::read_to_string(path) else {
        return;
    };
    let Ok(table) = content.parse::<toml::Table>() else {
        return;
    };

    for warning in unknown_key_warnings(&table) {
        log::warn!("{}: {}", path.display(), warning);
    }
}

/// Describe unknown sections and keys, with the closest known spelling.
#[must_use]
pub fn unknown_key_warnings(table: &toml::Table) -> Vec<String> {
    let sections: BTreeSet<&str> = KNOWN_KEYS.iter().map(|(s, _)| *s).collect();
    let mut warnings = Vec::new();

    for (section, value) in table {
        let Some((_, keys)) = KNOWN_KEYS.iter().find(|(s, _)| *s == section.as_str()) else {
            warnings.push(unknown_message("section", section, sections.iter().copied()));
            continue;
        };
        if let Some(inner) = value.as_table() {
            for key in inner.keys() {
                if !keys.contains(&key.as_str()) {
                    let name = format!("{section}.{key}");
                    warnings.push(unknown_message("key", &name, keys.iter().copied()));
                }
            }
        }
    }

    warnings
}

fn unknown_message<'a>(kind: &str, name: &str, candidates: impl Iterator<Item = &'a str>) -> String {
    let leaf = name.rsplit('.').next().unwrap_or(name);
    let best = candidates
        .map(|c| (c, strsim::jaro_winkler(leaf, c)))
        .filter(|(_, score)| *score > 0.8)
        .max_by(|a, b| a.1.total_cmp(&b.1));

    match best {
        Some((suggestion, _)) => format!("unknown {kind} '{name}', did you mean '{suggestion}'?"),
        None => format!("unknown {kind} '{name}' ignored"),
    }
}
