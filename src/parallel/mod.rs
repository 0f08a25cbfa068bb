//! Bounded-concurrency batch driver

use std::collections::HashSet;
use std::io;
use std::sync::Arc;
use std::time::{Duration, Instant};
use futures::stream::{FuturesUnordered, StreamExt};
use serde::Serialize;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use crate::config::ConversionProfile;
use crate::error::{Result, WebpBatchError};
use crate::processing::{
    convert_one, ensure_destination, enumerate, ConversionResult, ConversionTask, Encoder,
    FfmpegEncoder, Outcome,
};

pub mod progress;

pub use progress::*;

/// Runs one profile: discovers inputs, converts them through a bounded
/// worker pool and reports each result as it completes.
pub struct BatchDriver {
    encoder: Arc<dyn Encoder>,
    reporter: ProgressReporter,
}

impl BatchDriver {
    /// Create a driver around any encoder
    pub fn new(encoder: Arc<dyn Encoder>, reporter: ProgressReporter) -> Self {
        Self { encoder, reporter }
    }

    /// Create a driver that invokes the profile's ffmpeg program
    pub fn for_profile(profile: &ConversionProfile, reporter: ProgressReporter) -> Self {
        Self::new(Arc::new(FfmpegEncoder::new(profile.encoder.clone())), reporter)
    }

    /// Convert every matching file of `profile`.
    ///
    /// Errors only come from setup (invalid profile, destination blocked,
    /// source missing); per-file failures are counted in the summary.
    pub async fn run(&self, profile: &ConversionProfile) -> Result<BatchSummary> {
        let start_time = Instant::now();
        profile.validate()?;

        ensure_destination(&profile.dest_dir).await?;

        let files = {
            let source_dir = profile.source_dir.clone();
            let pattern = profile.pattern.clone();
            tokio::task::spawn_blocking(move || enumerate(&source_dir, &pattern))
                .await
                .map_err(|e| WebpBatchError::IoError(io::Error::other(e)))??
        };
        let total = files.len();

        info!(
            "Converting {} files from {:?} to {:?} ({})",
            total,
            profile.source_dir,
            profile.dest_dir,
            profile.codec.describe()
        );

        let mut progress = self.reporter.start(total, profile.workers);
        let mut summary = BatchSummary::new(total, profile.skip_existing);

        let (tasks, collisions) = plan_tasks(files, profile);
        for result in collisions {
            progress.record(&result);
            summary.record(result);
        }

        let semaphore = Arc::new(Semaphore::new(profile.workers));
        let mut pending: FuturesUnordered<_> = tasks
            .into_iter()
            .map(|task| {
                let semaphore = Arc::clone(&semaphore);
                let encoder = Arc::clone(&self.encoder);
                run_task(task, semaphore, encoder)
            })
            .collect();

        while let Some(result) = pending.next().await {
            progress.record(&result);
            summary.record(result);
        }

        summary.elapsed = start_time.elapsed();
        progress.finish(&summary);

        info!(
            "Batch completed in {:.2}s: {} succeeded, {} failed, {} skipped",
            summary.elapsed.as_secs_f64(),
            summary.tally.succeeded,
            summary.tally.failed,
            summary.tally.skipped
        );

        Ok(summary)
    }
}

/// Acquire a worker slot, then convert on the blocking pool.
///
/// The permit moves into the blocking closure so the slot is held for
/// exactly as long as the encoder process runs.
async fn run_task(
    task: ConversionTask,
    semaphore: Arc<Semaphore>,
    encoder: Arc<dyn Encoder>,
) -> ConversionResult {
    let source = task.source.clone();

    let permit = match semaphore.acquire_owned().await {
        Ok(permit) => permit,
        Err(e) => {
            return ConversionResult::failed(source, format!("worker pool closed: {}", e), Duration::ZERO)
        }
    };

    let joined = tokio::task::spawn_blocking(move || {
        let _permit = permit;
        convert_one(encoder.as_ref(), &task)
    })
    .await;

    match joined {
        Ok(result) => result,
        Err(e) => {
            warn!("Worker for {:?} did not complete: {}", source, e);
            ConversionResult::failed(source, format!("worker panicked: {}", e), Duration::ZERO)
        }
    }
}

/// Turn discovered files into tasks.
///
/// Two inputs that map to the same output name (`a.png` and `a.jpg` under
/// `*`) would race on one file; the later one fails up front instead.
fn plan_tasks(
    files: Vec<std::path::PathBuf>,
    profile: &ConversionProfile,
) -> (Vec<ConversionTask>, Vec<ConversionResult>) {
    let mut claimed = HashSet::new();
    let mut tasks = Vec::with_capacity(files.len());
    let mut collisions = Vec::new();

    for source in files {
        let task = ConversionTask::for_profile(source, profile);
        if claimed.insert(task.destination.clone()) {
            tasks.push(task);
        } else {
            debug!("Output {:?} already claimed, rejecting {:?}", task.destination, task.source);
            collisions.push(ConversionResult::failed(
                task.source,
                format!("output {} collides with another input", task.destination.display()),
                Duration::ZERO,
            ));
        }
    }

    (tasks, collisions)
}

/// Final counts for a batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Tally {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl Tally {
    /// Results recorded so far
    pub fn done(&self) -> usize {
        self.succeeded + self.failed + self.skipped
    }
}

/// Result of a whole batch
#[derive(Debug, Clone)]
pub struct BatchSummary {
    pub tally: Tally,
    /// Whether skip-on-exists was enabled, which decides if skips are reported
    pub skip_existing: bool,
    pub elapsed: Duration,
    /// Per-file results in completion order
    pub results: Vec<ConversionResult>,
}

impl BatchSummary {
    fn new(total: usize, skip_existing: bool) -> Self {
        Self {
            tally: Tally { total, ..Tally::default() },
            skip_existing,
            elapsed: Duration::ZERO,
            results: Vec::with_capacity(total),
        }
    }

    fn record(&mut self, result: ConversionResult) {
        match result.outcome {
            Outcome::Success => self.tally.succeeded += 1,
            Outcome::Failed => self.tally.failed += 1,
            Outcome::Skipped => self.tally.skipped += 1,
        }
        self.results.push(result);
    }

    /// Whether any file failed
    pub fn has_failures(&self) -> bool {
        self.tally.failed > 0
    }

    /// Average wall time per file
    pub fn average_time_per_file(&self) -> Duration {
        if self.tally.total == 0 {
            return Duration::ZERO;
        }
        self.elapsed / self.tally.total as u32
    }
}
