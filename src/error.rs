//! Structured error handling and exit codes.

use serde::Serialize;

use crate::reconcile::{ReconcileError, ReconcileReport, TreeSide};

/// Exit codes for the hashrecon application.
///
/// - 0: Success (every source file has a copy in the target)
/// - 1: General error (configuration problem, unusable tree, report not written)
/// - 2: Missing files (completed normally, some source content is absent)
/// - 3: Partial success (nothing missing, but some files or folders were skipped)
///
/// Missing files take precedence over skipped files: a skipped source file
/// is never reported missing, so code 3 means "nothing missing among what
/// could be read".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ExitCode {
    /// Success: every source file is reconciled.
    Success = 0,
    /// General error: An unexpected error occurred.
    GeneralError = 1,
    /// Missing files: at least one source file has no copy in the target.
    MissingFiles = 2,
    /// Partial success: nothing missing, but some non-fatal errors occurred.
    PartialSuccess = 3,
}

impl ExitCode {
    /// Get the numeric exit code.
    #[must_use]
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Get the machine-readable code prefix.
    #[must_use]
    pub fn code_prefix(self) -> &'static str {
        match self {
            Self::Success => "HR000",
            Self::GeneralError => "HR001",
            Self::MissingFiles => "HR002",
            Self::PartialSuccess => "HR003",
        }
    }

    /// Exit code for a completed reconciliation.
    #[must_use]
    pub fn from_report(report: &ReconcileReport) -> Self {
        if !report.is_reconciled() {
            Self::MissingFiles
        } else if report.has_errors() {
            Self::PartialSuccess
        } else {
            Self::Success
        }
    }
}

/// Structured error information for JSON output.
#[derive(Debug, Serialize)]
pub struct StructuredError {
    /// The error code (e.g., "HR001")
    pub code: String,
    /// The exit code number
    pub exit_code: i32,
    /// Human-readable error message, including its causes
    pub message: String,
    /// Tree the error belongs to, when it came from scanning one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tree: Option<TreeSide>,
}

impl StructuredError {
    /// Create a new structured error from an anyhow error and an exit code.
    #[must_use]
    pub fn new(err: &anyhow::Error, exit_code: ExitCode) -> Self {
        let tree = err
            .chain()
            .find_map(|cause| cause.downcast_ref::<ReconcileError>())
            .map(ReconcileError::side);

        Self {
            code: exit_code.code_prefix().to_string(),
            exit_code: exit_code.as_i32(),
            message: format!("{err:#}"),
            tree,
        }
    }
}
