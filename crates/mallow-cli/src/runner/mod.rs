/*!
# Runner

Runs the mallow pipeline over a batch of files.

Files are independent: each one is read, rewritten and (depending on the
[`Action`]) written back or diffed on its own rayon worker. A failure in one
file is recorded in its [`FileOutcome`] and never stops the rest of the batch.
*/

pub mod discover;
pub mod output;

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info, warn};

use mallow_core::{unified_diff, Pipeline, RewriteReport};

use output::Reporter;

/// What to do with a file whose output differs from its input
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Action {
    /// Overwrite the file
    #[default]
    Write,
    /// Produce a unified diff and leave the file alone
    Diff,
    /// Only record that the file would change
    Check,
}

/// Result of processing one file
#[derive(Debug, Clone, Serialize)]
pub struct FileOutcome {
    pub path: PathBuf,
    pub changed: bool,
    pub written: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<RewriteReport>,
    #[serde(skip)]
    pub diff: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl FileOutcome {
    fn failed(path: &Path, error: anyhow::Error) -> Self {
        Self {
            path: path.to_path_buf(),
            changed: false,
            written: false,
            report: None,
            diff: None,
            error: Some(format!("{error:#}")),
        }
    }

    pub fn is_failure(&self) -> bool {
        self.error.is_some()
    }
}

/// Aggregate of a batch run
#[derive(Debug, Default, Serialize)]
pub struct BatchSummary {
    pub files_processed: u64,
    pub files_changed: u64,
    pub files_failed: u64,
    /// Rewritten field calls across all files
    pub edits: u64,
    pub warnings: u64,
    pub files: Vec<FileOutcome>,
}

impl BatchSummary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, outcome: FileOutcome) {
        self.files_processed += 1;
        if outcome.is_failure() {
            self.files_failed += 1;
        }
        if outcome.changed {
            self.files_changed += 1;
        }
        if let Some(report) = &outcome.report {
            self.edits += report.edits.len() as u64;
            self.warnings += report.warnings.len() as u64;
        }
        self.files.push(outcome);
    }

    pub fn merge(&mut self, other: BatchSummary) {
        self.files_processed += other.files_processed;
        self.files_changed += other.files_changed;
        self.files_failed += other.files_failed;
        self.edits += other.edits;
        self.warnings += other.warnings;
        self.files.extend(other.files);
    }

    /// Share of files processed without error
    pub fn success_rate(&self) -> f64 {
        if self.files_processed == 0 {
            0.0
        } else {
            ((self.files_processed - self.files_failed) as f64) / (self.files_processed as f64)
        }
    }

    pub fn success(&self) -> bool {
        self.files_failed == 0
    }

    /// 2 if any file failed, 1 if `--check` found changes, 0 otherwise
    pub fn exit_code(&self, action: Action) -> u8 {
        if !self.success() {
            2
        } else if action == Action::Check && self.files_changed > 0 {
            1
        } else {
            0
        }
    }
}

/// Runs one pipeline configuration over many files
pub struct Runner {
    pipeline: Pipeline,
    action: Action,
}

impl Runner {
    pub fn new(pipeline: Pipeline) -> Self {
        Self {
            pipeline,
            action: Action::Write,
        }
    }

    pub fn with_action(mut self, action: Action) -> Self {
        self.action = action;
        self
    }

    /// Process `files` in parallel; outcomes keep the order of `files`
    pub fn run(&self, files: &[PathBuf]) -> BatchSummary {
        let summary = files
            .par_iter()
            .map(|path| self.process(path))
            .fold(BatchSummary::new, |mut summary, outcome| {
                summary.record(outcome);
                summary
            })
            .reduce(BatchSummary::new, |mut left, right| {
                left.merge(right);
                left
            });
        info!(
            files = summary.files_processed,
            changed = summary.files_changed,
            failed = summary.files_failed,
            "batch finished"
        );
        summary
    }

    /// Like [`Runner::run`], handing each outcome and the summary to `reporter`
    pub fn run_with(&self, files: &[PathBuf], reporter: &dyn Reporter) -> BatchSummary {
        let summary = self.run(files);
        for outcome in &summary.files {
            reporter.on_file(outcome, self.action);
        }
        reporter.on_summary(&summary, self.action);
        summary
    }

    /// Process a single file; errors end up in the outcome
    pub fn process(&self, path: &Path) -> FileOutcome {
        match self.try_process(path) {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(path = %path.display(), "{e:#}");
                FileOutcome::failed(path, e)
            }
        }
    }

    fn try_process(&self, path: &Path) -> Result<FileOutcome> {
        let label = path.display().to_string();
        let source =
            fs::read_to_string(path).with_context(|| format!("failed to read {label}"))?;
        let output = self
            .pipeline
            .run_file(&source, Some(&label))
            .with_context(|| format!("failed to rewrite {label}"))?;

        for warning in &output.report.warnings {
            warn!(file = %label, "{warning}");
        }

        let diff = match self.action {
            Action::Diff if output.changed => Some(unified_diff(
                &source,
                &output.text,
                &format!("a/{label}"),
                &format!("b/{label}"),
            )),
            _ => None,
        };

        let written = self.action == Action::Write && output.changed;
        if written {
            fs::write(path, &output.text).with_context(|| format!("failed to write {label}"))?;
            debug!(file = %label, "written");
        }

        Ok(FileOutcome {
            path: path.to_path_buf(),
            changed: output.changed,
            written,
            report: Some(output.report),
            diff,
            error: None,
        })
    }
}
