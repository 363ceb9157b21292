//! Report writers for reconciliation results.
//!
//! This module provides the report formats:
//! - CSV with a single `File Path` column, for spreadsheets
//! - JSON with per-tree statistics, for automation and scripting
//!
//! # Example
//!
//! ```no_run
//! use hashrecon::config::ReportFormat;
//! use hashrecon::error::ExitCode;
//! use hashrecon::output::write_report;
//! use hashrecon::reconcile::ReconcileReport;
//! use std::path::Path;
//!
//! let report = ReconcileReport::default();
//! write_report(&report, Path::new("missing_files.csv"), ReportFormat::Csv, true, ExitCode::Success)
//!     .unwrap();
//! ```

pub mod csv;
pub mod json;

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::config::ReportFormat;
use crate::error::ExitCode;
use crate::reconcile::ReconcileReport;

// Re-export main types
pub use self::csv::{CsvOutput, CsvOutputError};
pub use self::json::{JsonOutput, JsonOutputError};

/// Errors raised while writing the report file.
#[derive(Debug, Error)]
pub enum ReportError {
    /// The report file could not be created or written.
    #[error("Failed to write report {path}: {source}")]
    Io {
        /// Report file path
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// CSV serialization failed.
    #[error("Failed to write report {path}: {source}")]
    Csv {
        /// Report file path
        path: PathBuf,
        /// The underlying CSV error
        #[source]
        source: CsvOutputError,
    },

    /// JSON serialization failed.
    #[error("Failed to write report {path}: {source}")]
    Json {
        /// Report file path
        path: PathBuf,
        /// The underlying JSON error
        #[source]
        source: JsonOutputError,
    },
}

/// The missing paths in the order they will be written.
#[must_use]
pub fn ordered_missing(report: &ReconcileReport, sort: bool) -> Vec<PathBuf> {
    let mut missing = report.missing.clone();
    if sort {
        missing.sort();
    }
    missing
}

/// Write `report` to `path` in the requested format.
///
/// Parent directories are created. An existing file is replaced.
///
/// # Errors
///
/// Returns [`ReportError`] if the file cannot be written.
pub fn write_report(
    report: &ReconcileReport,
    path: &Path,
    format: ReportFormat,
    sort: bool,
    exit_code: ExitCode,
) -> Result<(), ReportError> {
    let io_err = |source: std::io::Error| ReportError::Io {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(io_err)?;
    }

    let missing = ordered_missing(report, sort);
    let mut writer = BufWriter::new(File::create(path).map_err(io_err)?);

    match format {
        ReportFormat::Csv => CsvOutput::new(&missing)
            .write_to(&mut writer)
            .map_err(|source| ReportError::Csv {
                path: path.to_path_buf(),
                source,
            })?,
        ReportFormat::Json => JsonOutput::new(report, &missing, exit_code)
            .write_to(&mut writer, true)
            .map_err(|source| ReportError::Json {
                path: path.to_path_buf(),
                source,
            })?,
    }

    writer.flush().map_err(io_err)?;
    log::debug!("Wrote {} missing paths to {}", missing.len(), path.display());
    Ok(())
}
