//! JSON report of missing files with per-tree statistics.
//!
//! # Output Schema
//!
//! ```json
//! {
//!   "generated_at": "2024-05-01T12:00:00Z",
//!   "missing": ["/photos/2019/beach.jpg"],
//!   "summary": {
//!     "missing_files": 1,
//!     "duration_ms": 1234,
//!     "exit_code": 2,
//!     "exit_code_name": "HR002",
//!     "source": { "root": "/photos", "files_fingerprinted": 812, ... },
//!     "target": { "root": "/mnt/backup/photos", "files_fingerprinted": 811, ... }
//!   }
//! }
//! ```
//!
//! # Example
//!
//! ```
//! use hashrecon::error::ExitCode;
//! use hashrecon::output::json::JsonOutput;
//! use hashrecon::reconcile::ReconcileReport;
//!
//! let report = ReconcileReport::default();
//! let output = JsonOutput::new(&report, &report.missing, ExitCode::Success);
//! assert!(output.to_json().unwrap().starts_with('{'));
//! ```

use std::io::Write;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::ExitCode;
use crate::reconcile::{ReconcileReport, TreeSummary};

/// Statistics for one tree in JSON format.
#[derive(Debug, Clone, Serialize)]
pub struct JsonTreeSummary {
    /// Canonical tree root
    pub root: String,
    /// Files yielded by the walk
    pub files_walked: usize,
    /// Files that made it into the index
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
    /// Messages of all recoverable errors
    pub errors: Vec<String>,
    /// Time spent on this tree in milliseconds
    pub duration_ms: u64,
}

impl From<&TreeSummary> for JsonTreeSummary {
    fn from(summary: &TreeSummary) -> Self {
        Self {
            root: summary.root.to_string_lossy().into_owned(),
            files_walked: summary.files_walked,
            files_fingerprinted: summary.files_fingerprinted,
            distinct_digests: summary.distinct_digests,
            cache_hits: summary.cache_hits,
            cache_misses: summary.cache_misses,
            filtered: summary.filtered,
            failed_files: summary.failed_files,
            skipped_dirs: summary.skipped_dirs,
            errors: summary.errors.iter().map(ToString::to_string).collect(),
            duration_ms: summary.duration.as_millis() as u64,
        }
    }
}

/// Run-level summary in JSON format.
#[derive(Debug, Clone, Serialize)]
pub struct JsonSummary {
    /// Number of missing source files
    pub missing_files: usize,
    /// Wall-clock time of the run in milliseconds
    pub duration_ms: u64,
    /// The exit code number
    pub exit_code: i32,
    /// The machine-readable exit code name (e.g., "HR002")
    pub exit_code_name: String,
    /// Source tree statistics
    pub source: JsonTreeSummary,
    /// Target tree statistics
    pub target: JsonTreeSummary,
}

/// Complete JSON output structure.
#[derive(Debug, Clone, Serialize)]
pub struct JsonOutput {
    /// When the report was produced
    pub generated_at: DateTime<Utc>,
    /// Source files with no copy in the target
    pub missing: Vec<String>,
    /// Run statistics
    pub summary: JsonSummary,
}

impl JsonOutput {
    /// Build the JSON document for a report.
    ///
    /// `missing` is passed separately so the caller decides the order.
    #[must_use]
    pub fn new(report: &ReconcileReport, missing: &[PathBuf], exit_code: ExitCode) -> Self {
        Self {
            generated_at: Utc::now(),
            missing: missing
                .iter()
                .map(|p| p.to_string_lossy().into_owned())
                .collect(),
            summary: JsonSummary {
                missing_files: missing.len(),
                duration_ms: report.duration.as_millis() as u64,
                exit_code: exit_code.as_i32(),
                exit_code_name: exit_code.code_prefix().to_string(),
                source: JsonTreeSummary::from(&report.source),
                target: JsonTreeSummary::from(&report.target),
            },
        }
    }

    /// Serialize to compact JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails (unlikely for valid data).
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Serialize to pretty-printed JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails (unlikely for valid data).
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Write JSON to a writer.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn write_to<W: Write>(&self, writer: &mut W, pretty: bool) -> Result<(), JsonOutputError> {
        if pretty {
            serde_json::to_writer_pretty(&mut *writer, self)?;
        } else {
            serde_json::to_writer(&mut *writer, self)?;
        }
        writer.write_all(b"\n")?;
        Ok(())
    }
}

/// Errors that can occur during JSON output.
#[derive(thiserror::Error, Debug)]
pub enum JsonOutputError {
    /// JSON serialization error
    #[error("JSON serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error during writing
    #[error("I/O error during JSON generation: {0}")]
    Io(#[from] std::io::Error),
}
