//! CSV report of missing files.
//!
//! One column, `File Path`, and one row per source file whose content has
//! no copy in the target. The file opens directly in any spreadsheet.
//!
//! # Example
//!
//! ```
//! use hashrecon::output::csv::CsvOutput;
//! use std::path::PathBuf;
//!
//! let missing = vec![PathBuf::from("/photos/2019/beach.jpg")];
//! let csv = CsvOutput::new(&missing).to_string().unwrap();
//! assert_eq!(csv, "File Path\n/photos/2019/beach.jpg\n");
//! ```

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Header of the single report column.
pub const HEADER: &str = "File Path";

/// Errors that can occur during CSV output generation.
#[derive(Debug, Error)]
pub enum CsvOutputError {
    /// I/O error during writing.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Error during CSV serialization.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// CSV output formatter.
pub struct CsvOutput<'a> {
    missing: &'a [PathBuf],
}

impl<'a> CsvOutput<'a> {
    /// Create a new CSV output formatter.
    #[must_use]
    pub fn new(missing: &'a [PathBuf]) -> Self {
        Self { missing }
    }

    /// Write the CSV output to the given writer.
    ///
    /// The header row is written even when nothing is missing.
    ///
    /// # Errors
    ///
    /// Returns `CsvOutputError` if writing or serialization fails.
    pub fn write_to<W: io::Write>(&self, writer: W) -> Result<(), CsvOutputError> {
        let mut csv_writer = csv::Writer::from_writer(writer);
        csv_writer.write_record([HEADER])?;

        for path in self.missing {
            let path = path.to_string_lossy();
            csv_writer.write_record([path.as_bytes()])?;
        }

        csv_writer.flush()?;
        Ok(())
    }

    /// Generate CSV output as a string.
    ///
    /// # Errors
    ///
    /// Returns `CsvOutputError` if serialization fails.
    pub fn to_string(&self) -> Result<String, CsvOutputError> {
        let mut buffer = Vec::new();
        self.write_to(&mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).to_string())
    }
}

/// Read the paths back from a CSV report.
///
/// The first row is taken as the header and skipped; the first column of
/// every other row is a path. Blank rows are ignored.
///
/// # Errors
///
/// Returns `CsvOutputError` if the file cannot be opened or parsed.
pub fn read_report(path: &Path) -> Result<Vec<PathBuf>, CsvOutputError> {
    read_from(File::open(path)?)
}

/// Read report paths from any reader. See [`read_report`].
///
/// # Errors
///
/// Returns `CsvOutputError` if parsing fails.
pub fn read_from<R: io::Read>(reader: R) -> Result<Vec<PathBuf>, CsvOutputError> {
    let mut csv_reader = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
    let mut paths = Vec::new();

    for record in csv_reader.records() {
        let record = record?;
        if let Some(field) = record.get(0).filter(|f| !f.is_empty()) {
            paths.push(PathBuf::from(field));
        }
    }

    Ok(paths)
}
