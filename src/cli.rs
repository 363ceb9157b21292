//! Command-line interface definitions for hashrecon.
//!
//! Every flag overrides the matching configuration key; see
//! [`crate::config`] for the layering order.
//!
//! # Example
//!
//! ```bash
//! # Which photos are not in the backup yet?
//! hashrecon ~/Pictures /mnt/backup/Pictures -i .jpg -i .png -i .mov
//!
//! # Same, taking everything else from a config file
//! hashrecon --config reconcile.toml
//!
//! # JSON report, cache in a custom location, both trees at once
//! hashrecon /data /mirror -i .parquet -f json -o report.json --cache-dir /tmp/hr --parallel-trees
//!
//! # Copy what is missing into TARGET/missed_files
//! hashrecon /data /mirror -i .csv --copy-missing
//!
//! # Copy from a report written earlier, without scanning again
//! hashrecon /data /mirror --copy-from missing_files.csv
//!
//! # Verbose mode for debugging
//! hashrecon -vv /data /mirror -i .csv
//! ```

use clap::Parser;
use std::path::PathBuf;

use crate::config::{ReportFormat, Settings};

/// Find files in a source tree with no content copy in a target tree.
///
/// Files are compared by content fingerprint (BLAKE3), never by name or
/// location. Source files whose content occurs nowhere in the target are
/// written to a report.
#[derive(Debug, Parser)]
#[command(name = "hashrecon")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Tree whose files must be accounted for
    #[arg(value_name = "SOURCE")]
    pub source: Option<PathBuf>,

    /// Tree searched for copies
    #[arg(value_name = "TARGET")]
    pub target: Option<PathBuf>,

    /// Configuration file (TOML)
    ///
    /// If not specified, config.toml in the platform config directory is used when present.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Extension to hash, e.g. .jpg (can be specified multiple times)
    ///
    /// Replaces the configured list when given.
    #[arg(short, long = "include", value_name = "EXT")]
    pub include: Vec<String>,

    /// Extension never to hash (can be specified multiple times)
    ///
    /// Exclusion wins over inclusion.
    #[arg(short, long = "exclude", value_name = "EXT")]
    pub exclude: Vec<String>,

    /// Files larger than this are hashed head+tail only (e.g., 100MB, 1GiB)
    ///
    /// Supports suffixes: B, KB, KiB, MB, MiB, GB, GiB, TB, TiB
    #[arg(long, value_name = "SIZE", value_parser = parse_size)]
    pub large_file_threshold: Option<u64>,

    /// Bytes hashed from each end of a large file (e.g., 1MiB)
    ///
    /// Supports suffixes: B, KB, KiB, MB, MiB, GB, GiB, TB, TiB
    #[arg(long, value_name = "SIZE", value_parser = parse_size)]
    pub partial_hash_size: Option<u64>,

    /// Number of hashing workers per tree (default: 4)
    ///
    /// Lower values reduce disk thrashing on HDDs.
    #[arg(short, long, value_name = "N")]
    pub workers: Option<usize>,

    /// Report file (default: missing_files.csv)
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Report format
    #[arg(short, long, value_enum)]
    pub format: Option<ReportFormat>,

    /// Sort missing paths in the report
    #[arg(long)]
    pub sort: bool,

    /// Copy missing files to TARGET/missed_files after the report is written
    ///
    /// Paths below the source root are kept; timestamps are preserved.
    #[arg(long)]
    pub copy_missing: bool,

    /// Copy the files listed in an existing CSV report to TARGET/missed_files
    ///
    /// Skips scanning; only the source and target directories are needed.
    #[arg(long, value_name = "CSV", conflicts_with = "copy_missing")]
    pub copy_from: Option<PathBuf>,

    /// Directory holding the fingerprint caches
    ///
    /// If not specified, a default platform-specific path is used.
    #[arg(long, value_name = "PATH")]
    pub cache_dir: Option<PathBuf>,

    /// Disable fingerprint caching
    #[arg(long, conflicts_with = "cache_dir")]
    pub no_cache: bool,

    /// Ignore existing caches and rebuild them from scratch
    #[arg(long)]
    pub clear_cache: bool,

    /// Follow symbolic links during scan
    ///
    /// Warning: symlink cycles abort the scan of that tree.
    #[arg(long)]
    pub follow_symlinks: bool,

    /// Scan source and target at the same time
    ///
    /// Faster when the trees live on different disks.
    #[arg(long)]
    pub parallel_trees: bool,

    /// Skip the counting pass; progress shows a spinner instead of a bar
    #[arg(long)]
    pub no_precount: bool,

    /// Print the merged configuration as TOML and exit
    #[arg(long)]
    pub print_config: bool,

    /// Increase verbosity level (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, env = "NO_COLOR")]
    pub no_color: bool,

    /// Print fatal errors as JSON on stderr
    #[arg(long)]
    pub json_errors: bool,
}

impl Cli {
    /// Overlay the flags that were given onto `settings`.
    pub fn apply_to(&self, settings: &mut Settings) {
        if let Some(ref source) = self.source {
            settings.directories.source_dir = Some(source.clone());
        }
        if let Some(ref target) = self.target {
            settings.directories.target_dir = Some(target.clone());
        }
        if !self.include.is_empty() {
            settings.file_types.included_extensions = split_list(&self.include);
        }
        if !self.exclude.is_empty() {
            settings.file_types.excluded_extensions = split_list(&self.exclude);
        }
        if let Some(threshold) = self.large_file_threshold {
            settings.hashing.large_file_threshold = threshold;
        }
        if let Some(partial) = self.partial_hash_size {
            settings.hashing.partial_hash_size = partial;
        }
        if let Some(workers) = self.workers {
            settings.hashing.workers = workers;
        }
        if self.follow_symlinks {
            settings.hashing.follow_symlinks = true;
        }
        if self.parallel_trees {
            settings.hashing.parallel_trees = true;
        }
        if self.no_precount {
            settings.hashing.precount = false;
        }
        if let Some(ref dir) = self.cache_dir {
            settings.cache.dir = Some(dir.clone());
        }
        if self.no_cache {
            settings.cache.enabled = false;
        }
        if let Some(ref output) = self.output {
            settings.output.path = output.clone();
        }
        if let Some(format) = self.format {
            settings.output.format = format;
        }
        if self.sort {
            settings.output.sort = true;
        }
        if self.copy_missing {
            settings.output.copy_missing = true;
        }
    }
}

/// Accept both repeated flags and comma-separated values (`-i .jpg,.png`).
fn split_list(values: &[String]) -> Vec<String> {
    values
        .iter()
        .flat_map(|v| v.split(','))
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .collect()
}

/// Parse a human-readable size string into bytes.
///
/// Supports suffixes: B, KB, KiB, MB, MiB, GB, GiB, TB, TiB
/// Case-insensitive. Numbers without suffix are treated as bytes.
///
/// # Examples
///
/// ```
/// use hashrecon::cli::parse_size;
///
/// assert_eq!(parse_size("1024").unwrap(), 1024);
/// assert_eq!(parse_size("1KB").unwrap(), 1000);
/// assert_eq!(parse_size("1KiB").unwrap(), 1024);
/// assert_eq!(parse_size("1MB").unwrap(), 1_000_000);
/// assert_eq!(parse_size("1MiB").unwrap(), 1_048_576);
/// ```
/// # Errors
///
/// Returns an error if the string is empty, contains an invalid number,
/// a negative number, or an unknown size suffix.
pub fn parse_size(s: &str) -> Result<u64, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("Size cannot be empty".to_string());
    }

    // Find where the number ends and the suffix begins
    let (num_str, suffix) = match s.find(|c: char| !c.is_ascii_digit() && c != '.') {
        Some(idx) => (&s[..idx], s[idx..].trim().to_uppercase()),
        None => (s, String::new()),
    };

    let num: f64 = num_str
        .parse()
        .map_err(|_| format!("Invalid number: '{num_str}'"))?;

    if num < 0.0 {
        return Err("Size cannot be negative".to_string());
    }

    let multiplier: u64 = match suffix.as_str() {
        "" | "B" => 1,
        "KB" | "K" => 1_000,
        "KIB" => 1_024,
        "MB" | "M" => 1_000_000,
        "MIB" => 1_048_576,
        "GB" | "G" => 1_000_000_000,
        "GIB" => 1_073_741_824,
        "TB" | "T" => 1_000_000_000_000,
        "TIB" => 1_099_511_627_776,
        _ => return Err(format!("Unknown size suffix: '{suffix}'")),
    };

    Ok((num * multiplier as f64) as u64)
}
