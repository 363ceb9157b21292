//! hashrecon - content-based one-way directory reconciliation
//!
//! Finds the files in a source tree whose content exists nowhere in a
//! target tree, comparing BLAKE3 fingerprints rather than names or paths.
//! Typical use is verifying that a copy, backup or migration is complete.
//!
//! # Architecture
//!
//! - [`scanner`]: eligibility filter, lazy directory walker, fingerprinting
//! - [`cache`]: persistent path-to-digest cache, one per tree
//! - [`reconcile`]: bounded hashing pool, digest index, diff and orchestration
//! - [`output`]: CSV and JSON reports
//! - [`actions`]: copying missing files into the target tree
//! - [`config`], [`cli`], [`logging`], [`progress`], [`error`]: the application shell

pub mod actions;
pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod output;
pub mod progress;
pub mod reconcile;
pub mod scanner;

use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context};
use bytesize::ByteSize;
use yansi::Paint;

use crate::actions::BatchCopyResult;
use crate::cache::FingerprintCache;
use crate::cli::Cli;
use crate::config::Settings;
use crate::error::ExitCode;
use crate::progress::{Progress, ProgressCallback};
use crate::reconcile::{ReconcileReport, Reconciler, TreeSummary};

/// Run the application for parsed command-line arguments.
///
/// Fatal problems are returned as errors; everything else, including
/// missing files, is expressed through the returned [`ExitCode`].
///
/// # Errors
///
/// Returns an error for invalid configuration, an unusable tree root, or a
/// report that cannot be written.
pub fn run_app(cli: Cli) -> anyhow::Result<ExitCode> {
    logging::init_logging(cli.verbose, cli.quiet, cli.no_color);
    if cli.no_color {
        yansi::disable();
    }

    if let Some(ref path) = cli.config {
        if !path.is_file() {
            bail!("Configuration file not found: {}", path.display());
        }
    }

    let mut settings =
        Settings::load(cli.config.as_deref()).context("Failed to load configuration")?;
    cli.apply_to(&mut settings);

    if cli.print_config {
        print!(
            "{}",
            settings.to_toml().context("Failed to render configuration")?
        );
        return Ok(ExitCode::Success);
    }

    if let Some(ref report_path) = cli.copy_from {
        return copy_from_report(report_path, &settings, cli.quiet);
    }

    settings.validate()?;
    let (Some(source), Some(target)) = (
        settings.directories.source_dir.clone(),
        settings.directories.target_dir.clone(),
    ) else {
        bail!("Source and target directories are required");
    };

    log::debug!("Effective settings: {:?}", settings);

    let (source_cache_path, target_cache_path) = settings.cache_paths();
    let (source_cache, target_cache) = if !settings.cache.enabled {
        log::debug!("Fingerprint cache disabled");
        (FingerprintCache::new(), FingerprintCache::new())
    } else if cli.clear_cache {
        log::info!("Ignoring existing fingerprint caches");
        (FingerprintCache::new(), FingerprintCache::new())
    } else {
        (
            FingerprintCache::load_or_empty(&source_cache_path),
            FingerprintCache::load_or_empty(&target_cache_path),
        )
    };
    let source_cache = Arc::new(source_cache);
    let target_cache = Arc::new(target_cache);

    let progress = Arc::new(Progress::new(cli.quiet));
    let reconciler = Reconciler::new(
        settings
            .reconcile_config()
            .with_progress_callback(Arc::clone(&progress) as Arc<dyn ProgressCallback>),
    );

    let report = reconciler
        .reconcile(
            &source,
            &target,
            Arc::clone(&source_cache),
            Arc::clone(&target_cache),
        )
        .context("Reconciliation failed")?;

    let exit_code = ExitCode::from_report(&report);
    output::write_report(
        &report,
        &settings.output.path,
        settings.output.format,
        settings.output.sort,
        exit_code,
    )?;

    if !cli.quiet {
        print_summary(&report, &settings);
    }

    if settings.output.copy_missing && !report.missing.is_empty() {
        let copied = actions::copy_missing(
            &report.missing,
            &report.source.root,
            &target,
            Some(&*progress as &dyn ProgressCallback),
        );
        if !cli.quiet {
            print_copy_summary(&copied, &target);
        }
    }

    if settings.cache.enabled {
        save_cache(&source_cache, &source_cache_path);
        save_cache(&target_cache, &target_cache_path);
    }

    Ok(exit_code)
}

/// Copy the files listed in an existing CSV report without scanning.
///
/// Only the two tree roots are required. Any failed copy makes the run a
/// partial success.
fn copy_from_report(report_path: &Path, settings: &Settings, quiet: bool) -> anyhow::Result<ExitCode> {
    let (Some(source), Some(target)) = (
        settings.directories.source_dir.as_deref(),
        settings.directories.target_dir.as_deref(),
    ) else {
        bail!("Source and target directories are required");
    };
    for (label, root) in [("Source", source), ("Target", target)] {
        if !root.is_dir() {
            bail!("{} directory not found: {}", label, root.display());
        }
    }

    let files = output::csv::read_report(report_path)
        .with_context(|| format!("Failed to read report {}", report_path.display()))?;
    log::info!("{} file(s) listed in {}", files.len(), report_path.display());

    let progress = Progress::new(quiet);
    let copied = actions::copy_missing(
        &files,
        source,
        target,
        Some(&progress as &dyn ProgressCallback),
    );
    if !quiet {
        print_copy_summary(&copied, target);
    }

    Ok(if copied.all_succeeded() {
        ExitCode::Success
    } else {
        ExitCode::PartialSuccess
    })
}

/// Persist a cache, logging instead of failing.
fn save_cache(cache: &FingerprintCache, path: &Path) {
    if let Err(e) = cache.save(path) {
        log::warn!("{}; the next run will re-hash these files", e);
    }
}

fn print_summary(report: &ReconcileReport, settings: &Settings) {
    println!();
    print_tree_line("Source", &report.source);
    print_tree_line("Target", &report.target);

    let policy = settings.hashing_policy();
    println!(
        "Files above {} were hashed by their first and last {}",
        ByteSize::b(policy.large_file_threshold),
        ByteSize::b(policy.partial_hash_size)
    );

    if report.has_errors() {
        println!(
            "{} {} files or folders could not be read (see warnings above)",
            "Skipped:".yellow().bold(),
            report.error_count()
        );
    }

    if report.is_reconciled() {
        println!(
            "{} every source file has a copy in the target",
            "Reconciled:".green().bold()
        );
    } else {
        println!(
            "{} {} source files have no copy in the target",
            "Missing:".red().bold(),
            report.missing_count()
        );
    }
    println!(
        "Report written to {} in {:.2?}",
        settings.output.path.display(),
        report.duration
    );
}

fn print_copy_summary(copied: &BatchCopyResult, target: &Path) {
    println!(
        "{} {} files ({}) to {}",
        "Copied:".green().bold(),
        copied.success_count(),
        ByteSize::b(copied.bytes_copied),
        target.join(actions::MISSED_FILES_DIR).display()
    );
    if !copied.all_succeeded() {
        println!(
            "{} {} files could not be copied (see warnings above)",
            "Failed:".red().bold(),
            copied.failure_count()
        );
    }
}

fn print_tree_line(label: &str, summary: &TreeSummary) {
    println!(
        "{} {} files fingerprinted, {} distinct ({} from cache) in {}",
        format!("{label}:").bold(),
        summary.files_fingerprinted,
        summary.distinct_digests,
        summary.cache_hits,
        summary.root.display()
    );
}
