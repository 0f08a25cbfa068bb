//! webpbatch - Batch WebP Conversion for Gallery Assets
//!
//! Converts a flat directory of images to WebP by running one external
//! encoder process (`ffmpeg`) per file through a bounded worker pool, then
//! reports every file's outcome and a final tally.
//!
//! # Features
//!
//! - **Bounded Parallelism**: at most `workers` encoder processes at once
//! - **Two Built-in Variants**: scaled lossy thumbnails, full-size lossless
//! - **Skip-on-Exists**: optionally leave already converted files alone
//! - **Contained Failures**: a failing file never stops the batch
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use webpbatch::{BatchDriver, Profiles, ProgressReporter};
//!
//! # async fn demo() -> webpbatch::Result<()> {
//! let profile = Profiles::thumbnail().workers(8);
//! let driver = BatchDriver::for_profile(&profile, ProgressReporter::default());
//! let summary = driver.run(&profile).await?;
//!
//! println!("{} of {} converted", summary.tally.succeeded, summary.tally.total);
//! # Ok(())
//! # }
//! ```

#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod processing;
pub mod parallel;

// Re-export commonly used types
pub use config::{CodecParams, Config, ConversionProfile, LoggingConfig, Profiles};
pub use error::{Result, WebpBatchError};
pub use parallel::{BatchDriver, BatchSummary, ProgressReporter, ReportFormat, Tally};
pub use processing::{ConversionResult, ConversionTask, Encoder, FfmpegEncoder, Outcome};

use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize logging with default settings.
///
/// Honors `RUST_LOG`, falling back to `info`. Safe to call more than once;
/// only the first call installs a subscriber.
pub fn init() -> bool {
    init_with_config(&LoggingConfig::default(), None)
}

/// Initialize logging from configuration.
///
/// `level_override` (from `--verbose`/`--quiet`) beats `RUST_LOG`, which
/// beats `logging.level`. Logs go to stderr; stdout carries the report.
/// Returns whether this call installed the global subscriber.
pub fn init_with_config(logging: &LoggingConfig, level_override: Option<&str>) -> bool {
    let filter = match level_override {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level)),
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    let installed = if logging.json_format {
        tracing::subscriber::set_global_default(builder.json().finish()).is_ok()
    } else {
        tracing::subscriber::set_global_default(builder.finish()).is_ok()
    };

    if installed {
        debug!("webpbatch v{} initialized", VERSION);
    }
    installed
}
