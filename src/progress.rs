//! Progress reporting utilities using indicatif.
//!
//! This module provides the [`ProgressCallback`] trait the reconciliation
//! pipeline reports through, and [`Progress`], which renders one bar per
//! scanned tree in the terminal.
//!
//! Workers call [`ProgressCallback::on_progress`] once for every path they
//! take off the queue, whether it was hashed, served from cache, filtered
//! out or failed, so the bar always ends at the number of walked files.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

use crate::actions::COPY_PHASE;
use crate::scanner::ScanError;

/// Progress callback for reconciliation phases.
///
/// A phase is one tree's pipeline, named after the tree (`"source"`,
/// `"target"`). Implementations must tolerate calls from several worker
/// threads at once.
pub trait ProgressCallback: Send + Sync {
    /// Called when a phase starts.
    ///
    /// # Arguments
    ///
    /// * `phase` - Name of the phase (e.g., "source", "target")
    /// * `total` - Number of files expected, or 0 when unknown
    fn on_phase_start(&self, phase: &str, total: usize);

    /// Called once per path consumed by a worker.
    ///
    /// # Arguments
    ///
    /// * `phase` - Name of the phase
    /// * `current` - Number of paths consumed so far in this phase (1-based)
    /// * `path` - Path just consumed
    fn on_progress(&self, phase: &str, current: usize, path: &str);

    /// Called when a phase completes.
    fn on_phase_end(&self, phase: &str);

    /// Called to update the progress message.
    fn on_message(&self, _message: &str) {}

    /// Called for every recoverable error: a skipped subtree or a file that
    /// could not be fingerprinted.
    fn on_error(&self, _phase: &str, _error: &ScanError) {}
}

/// Progress reporter using indicatif.
pub struct Progress {
    multi: MultiProgress,
    bars: Mutex<HashMap<String, ProgressBar>>,
    quiet: bool,
}

impl Progress {
    /// Create a new progress reporter.
    ///
    /// # Arguments
    ///
    /// * `quiet` - If true, no progress bars will be displayed.
    ///
    /// # Examples
    ///
    /// ```
    /// use hashrecon::progress::Progress;
    ///
    /// let progress = Progress::new(false);
    /// ```
    #[must_use]
    pub fn new(quiet: bool) -> Self {
        Self {
            multi: MultiProgress::new(),
            bars: Mutex::new(HashMap::new()),
            quiet,
        }
    }

    /// Bar for a phase with a known file count.
    fn bar_style() -> ProgressStyle {
        ProgressStyle::with_template(
            "{prefix:>7} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg} (ETA: {eta})",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█>-")
    }

    /// Spinner for a phase whose file count was not pre-computed.
    fn spinner_style() -> ProgressStyle {
        ProgressStyle::with_template("{prefix:>7} {spinner:.green} [{elapsed_precise}] {pos} files {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
    }

    fn with_bar(&self, phase: &str, f: impl FnOnce(&ProgressBar)) {
        let bars = self.bars.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(pb) = bars.get(phase) {
            f(pb);
        }
    }
}

impl ProgressCallback for Progress {
    fn on_phase_start(&self, phase: &str, total: usize) {
        if self.quiet {
            return;
        }

        let pb = if total > 0 {
            let pb = self.multi.add(ProgressBar::new(total as u64));
            pb.set_style(Self::bar_style());
            pb
        } else {
            let pb = self.multi.add(ProgressBar::new_spinner());
            pb.set_style(Self::spinner_style());
            pb.enable_steady_tick(Duration::from_millis(100));
            pb
        };
        pb.set_prefix(phase.to_string());
        pb.set_message(if phase == COPY_PHASE { "Copying" } else { "Fingerprinting" });

        self.bars
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(phase.to_string(), pb);
    }

    fn on_progress(&self, phase: &str, current: usize, path: &str) {
        if self.quiet {
            return;
        }

        self.with_bar(phase, |pb| {
            // Workers race; never move the bar backwards
            if current as u64 > pb.position() {
                pb.set_position(current as u64);
            }
            pb.set_message(truncate_path(path, 30));
        });
    }

    fn on_phase_end(&self, phase: &str) {
        if self.quiet {
            return;
        }

        let removed = self
            .bars
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(phase);
        if let Some(pb) = removed {
            pb.finish_with_message("done");
        }
    }

    fn on_message(&self, message: &str) {
        if self.quiet {
            return;
        }
        let _ = self.multi.println(message);
    }

    fn on_error(&self, phase: &str, error: &ScanError) {
        if self.quiet {
            return;
        }
        let _ = self.multi.println(format!("[{phase}] warning: {error}"));
    }
}

/// Truncate a path for display in the progress bar.
fn truncate_path(path: &str, max_len: usize) -> String {
    if path.chars().count() <= max_len {
        return path.to_string();
    }

    let file_name = std::path::Path::new(path)
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();

    let name_len = file_name.chars().count();
    if name_len + 4 > max_len {
        let tail: String = file_name
            .chars()
            .skip(name_len.saturating_sub(max_len.saturating_sub(3)))
            .collect();
        return format!("...{tail}");
    }

    format!(".../{file_name}")
}
