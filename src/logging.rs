//! Logging infrastructure for hashrecon.
//!
//! Structured logging goes through the `log` facade with an `env_logger`
//! backend. The level is chosen by, in priority order:
//!
//! 1. The `RUST_LOG` environment variable, if set
//! 2. CLI flags: `--quiet` (errors only) or `--verbose` (debug/trace)
//! 3. Default: info
//!
//! Per-file problems are logged at warn, per-file cache hits at trace, so
//! `-vv` shows exactly how every file was resolved.
//!
//! # Build-specific Formatting
//!
//! - **Debug builds**: timestamp, level, and with `-v` the module path
//! - **Release builds**: level and message only
//!
//! # Example
//!
//! ```rust,no_run
//! use hashrecon::logging::init_logging;
//!
//! // -vv, colors allowed
//! init_logging(2, false, false);
//! log::trace!("Cache hit: /data/a.txt");
//! ```

use env_logger::{Builder, WriteStyle};
use log::LevelFilter;
use std::env;
use std::io::Write;

/// Initialize the logging subsystem from CLI flags.
///
/// Only the first call in a process installs a logger; later calls are
/// ignored and return `false`, so running the application twice in one
/// process (as the integration tests do) is harmless.
///
/// # Arguments
///
/// * `verbose` - Verbosity count from CLI (0=info, 1=debug, 2+=trace)
/// * `quiet` - If true, only show errors (overridden by `RUST_LOG`)
/// * `no_color` - Never emit ANSI styles
pub fn init_logging(verbose: u8, quiet: bool, no_color: bool) -> bool {
    let use_env = env::var("RUST_LOG").is_ok();
    let level = determine_level(verbose, quiet);

    let mut builder = Builder::new();
    if use_env {
        builder.parse_default_env();
    } else {
        builder.filter_level(level);
    }
    if no_color {
        builder.write_style(WriteStyle::Never);
    }

    configure_format(&mut builder, verbose);

    if builder.try_init().is_err() {
        return false;
    }

    if use_env {
        log::debug!(
            "Logging initialized from RUST_LOG: {:?}",
            env::var("RUST_LOG").ok()
        );
    } else {
        log::debug!("Logging initialized at level: {:?}", level);
    }
    true
}

/// Map CLI flags to a level filter. Quiet beats verbose.
fn determine_level(verbose: u8, quiet: bool) -> LevelFilter {
    if quiet {
        LevelFilter::Error
    } else {
        match verbose {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    }
}

fn configure_format(builder: &mut Builder, verbose: u8) {
    #[cfg(debug_assertions)]
    {
        builder.format(move |buf, record| {
            let timestamp = buf.timestamp_seconds();
            let level = record.level();
            let level_style = buf.default_level_style(level);

            if verbose >= 1 {
                writeln!(
                    buf,
                    "{} {level_style}{:<5}{level_style:#} [{}] {}",
                    timestamp,
                    level,
                    record.module_path().unwrap_or("unknown"),
                    record.args()
                )
            } else {
                writeln!(
                    buf,
                    "{} {level_style}{:<5}{level_style:#} {}",
                    timestamp,
                    level,
                    record.args()
                )
            }
        });
    }

    #[cfg(not(debug_assertions))]
    {
        let _ = verbose;
        builder.format(|buf, record| {
            let level = record.level();
            let level_style = buf.default_level_style(level);
            writeln!(
                buf,
                "{level_style}{:<5}{level_style:#} {}",
                level,
                record.args()
            )
        });
    }
}
