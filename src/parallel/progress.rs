//! Progress reporting for batch runs

use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use tracing::warn;

use crate::parallel::{BatchSummary, Tally};
use crate::processing::{ConversionResult, Outcome};

/// How a batch reports to stdout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    /// Human-readable lines plus a progress bar on stderr when attached to a terminal
    Text,
    /// One JSON object per line
    Json,
    /// Nothing
    Silent,
}

/// Creates per-batch progress handles.
///
/// Text output adds an indicatif bar on stderr, which indicatif hides when
/// stderr is not a terminal.
#[derive(Debug, Clone)]
pub struct ProgressReporter {
    format: ReportFormat,
}

impl ProgressReporter {
    pub fn new(format: ReportFormat) -> Self {
        Self { format }
    }

    /// Reporter that prints nothing
    pub fn silent() -> Self {
        Self::new(ReportFormat::Silent)
    }

    pub fn format(&self) -> ReportFormat {
        self.format
    }

    /// Announce a batch and return the handle that reports its results
    pub fn start(&self, total: usize, workers: usize) -> BatchProgress {
        match self.format {
            ReportFormat::Text => {
                println!("Found {} files", total);
                println!("Converting {} images with {} workers...", total, workers);
            }
            ReportFormat::Json => emit(&ProgressEvent::Started { total, workers }),
            ReportFormat::Silent => {}
        }

        let bar = if self.format == ReportFormat::Text && total > 0 {
            let pb = ProgressBar::new(total as u64);
            match ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} ({per_sec}, {eta})")
            {
                Ok(bar_style) => pb.set_style(bar_style.progress_chars("#>-")),
                Err(e) => warn!("Invalid progress bar template: {}", e),
            }
            pb
        } else {
            ProgressBar::hidden()
        };

        BatchProgress {
            format: self.format,
            bar,
            total,
            done: 0,
        }
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new(ReportFormat::Text)
    }
}

/// Reporting state for one running batch.
///
/// Only the driver's collecting loop touches this, so the counter needs no
/// synchronisation.
pub struct BatchProgress {
    format: ReportFormat,
    bar: ProgressBar,
    total: usize,
    done: usize,
}

impl BatchProgress {
    /// Report one completed task
    pub fn record(&mut self, result: &ConversionResult) {
        self.done += 1;

        match self.format {
            ReportFormat::Text => {
                let line = styled_progress_line(self.done, self.total, result);
                self.bar.suspend(|| println!("{}", line));
                self.bar.inc(1);
            }
            ReportFormat::Json => emit(&ProgressEvent::Completed {
                done: self.done,
                total: self.total,
                result,
            }),
            ReportFormat::Silent => {}
        }
    }

    /// Results reported so far
    pub fn done(&self) -> usize {
        self.done
    }

    /// Print the final tally
    pub fn finish(self, summary: &BatchSummary) {
        self.bar.finish_and_clear();

        match self.format {
            ReportFormat::Text => {
                println!();
                println!("{}", format_tally(summary));
            }
            ReportFormat::Json => emit(&ProgressEvent::Finished {
                tally: summary.tally,
                elapsed_secs: summary.elapsed.as_secs_f64(),
            }),
            ReportFormat::Silent => {}
        }
    }
}

/// JSON line events
#[derive(Debug, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
enum ProgressEvent<'a> {
    Started {
        total: usize,
        workers: usize,
    },
    Completed {
        done: usize,
        total: usize,
        #[serde(flatten)]
        result: &'a ConversionResult,
    },
    Finished {
        #[serde(flatten)]
        tally: Tally,
        elapsed_secs: f64,
    },
}

fn emit(event: &ProgressEvent<'_>) {
    match serde_json::to_string(event) {
        Ok(line) => println!("{}", line),
        Err(e) => warn!("Failed to serialize progress event: {}", e),
    }
}

/// `[done/total] STATUS name` with `: message` appended for failures
pub fn format_progress_line(done: usize, total: usize, result: &ConversionResult) -> String {
    let mut line = format!(
        "[{}/{}] {} {}",
        done,
        total,
        result.outcome.label(),
        result.display_name()
    );
    if result.outcome == Outcome::Failed {
        line.push_str(": ");
        line.push_str(&result.message);
    }
    line
}

fn styled_progress_line(done: usize, total: usize, result: &ConversionResult) -> String {
    let status = match result.outcome {
        Outcome::Success => style(result.outcome.label()).green(),
        Outcome::Skipped => style(result.outcome.label()).yellow(),
        Outcome::Failed => style(result.outcome.label()).red().bold(),
    };

    let mut line = format!(
        "{} {} {}",
        style(format!("[{}/{}]", done, total)).dim(),
        status,
        result.display_name()
    );
    if result.outcome == Outcome::Failed {
        line.push_str(": ");
        line.push_str(&result.message);
    }
    line
}

/// Final one-line summary.
///
/// The skipped count only appears for batches that can skip.
pub fn format_tally(summary: &BatchSummary) -> String {
    let tally = &summary.tally;
    if summary.skip_existing {
        format!(
            "Done! {} succeeded, {} failed, {} skipped.",
            tally.succeeded, tally.failed, tally.skipped
        )
    } else {
        format!("Done! {} succeeded, {} failed.", tally.succeeded, tally.failed)
    }
}
