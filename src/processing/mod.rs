//! Per-file conversion: tasks, results and the single-task state machine

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use serde::Serialize;
use tracing::debug;

use crate::config::{CodecParams, ConversionProfile};

pub mod discovery;
pub mod encoder;

pub use discovery::*;
pub use encoder::*;

/// Message used when a failed encoder wrote nothing to stderr
pub const NO_DIAGNOSTIC: &str = "no diagnostic output";

/// One input file scheduled for conversion.
///
/// Created at enumeration time and consumed by exactly one worker.
#[derive(Debug, Clone)]
pub struct ConversionTask {
    pub source: PathBuf,
    pub destination: PathBuf,
    pub codec: CodecParams,
    pub skip_existing: bool,
}

impl ConversionTask {
    /// Build the task for `source` under the profile's destination directory
    pub fn for_profile(source: PathBuf, profile: &ConversionProfile) -> Self {
        let destination = output_path_for(&source, &profile.dest_dir, profile.codec);
        Self {
            source,
            destination,
            codec: profile.codec,
            skip_existing: profile.skip_existing,
        }
    }

    /// File name of the source, for progress lines
    pub fn display_name(&self) -> String {
        display_name(&self.source)
    }
}

/// Terminal state of a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Success,
    Skipped,
    Failed,
}

impl Outcome {
    /// Status word used in progress lines
    pub fn label(self) -> &'static str {
        match self {
            Self::Success => "OK",
            Self::Skipped => "SKIPPED",
            Self::Failed => "FAILED",
        }
    }
}

/// What happened to one task
#[derive(Debug, Clone, Serialize)]
pub struct ConversionResult {
    pub source: PathBuf,
    pub outcome: Outcome,
    /// Diagnostic tail for failures, empty otherwise
    pub message: String,
    #[serde(skip)]
    pub elapsed: Duration,
}

impl ConversionResult {
    /// Create a successful result
    pub fn success(source: PathBuf, elapsed: Duration) -> Self {
        Self {
            source,
            outcome: Outcome::Success,
            message: String::new(),
            elapsed,
        }
    }

    /// Create a skipped result
    pub fn skipped(source: PathBuf) -> Self {
        Self {
            source,
            outcome: Outcome::Skipped,
            message: String::new(),
            elapsed: Duration::ZERO,
        }
    }

    /// Create a failed result
    pub fn failed<S: Into<String>>(source: PathBuf, message: S, elapsed: Duration) -> Self {
        Self {
            source,
            outcome: Outcome::Failed,
            message: message.into(),
            elapsed,
        }
    }

    /// File name of the source, for progress lines
    pub fn display_name(&self) -> String {
        display_name(&self.source)
    }

    pub fn is_failed(&self) -> bool {
        self.outcome == Outcome::Failed
    }
}

/// Run one task to a terminal state.
///
/// Never returns an error: encoder failures of any kind become a
/// [`Outcome::Failed`] result.
pub fn convert_one(encoder: &dyn Encoder, task: &ConversionTask) -> ConversionResult {
    if task.skip_existing && task.destination.exists() {
        debug!("Skipping {:?}, {:?} already exists", task.source, task.destination);
        return ConversionResult::skipped(task.source.clone());
    }

    let start_time = Instant::now();
    debug!("Converting {:?} -> {:?}", task.source, task.destination);

    let outcome = encoder.encode(task);
    let elapsed = start_time.elapsed();

    match outcome {
        EncodeOutcome::Finished { success: true, .. } => {
            ConversionResult::success(task.source.clone(), elapsed)
        }
        EncodeOutcome::Finished { success: false, stderr } => {
            ConversionResult::failed(task.source.clone(), diagnostic_tail(&stderr), elapsed)
        }
        EncodeOutcome::SpawnFailed(message) => {
            ConversionResult::failed(task.source.clone(), message, elapsed)
        }
    }
}

/// Last non-empty line of an encoder's stderr.
///
/// ffmpeg rewrites its status line with bare carriage returns, so both
/// `\r` and `\n` end a line here.
pub fn diagnostic_tail(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    text.split(['\n', '\r'])
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .last()
        .map(str::to_string)
        .unwrap_or_else(|| NO_DIAGNOSTIC.to_string())
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
