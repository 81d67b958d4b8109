//! Test run dispatching
//!
//! Launches one external runner process per target and turns each process
//! into a [`RunOutcome`]. Individual failures never abort the batch:
//!
//! | process result        | outcome                        |
//! |-----------------------|--------------------------------|
//! | exit code 0           | `RunStatus::Success`           |
//! | non-zero / signal     | `RunStatus::Failure`           |
//! | spawn/wait/timeout    | `RunStatus::ProcessError`      |
//!
//! Targets are dispatched in the order given. With `concurrency > 1` up to
//! that many runners are alive at once; outcomes are still returned in target
//! order. Every run gets its own raw result stem
//! (`<prefix>_<index>_<url hash>_<attempt>`), so concurrent runners never
//! write to the same file. Stems already present in the raw directory (left
//! by an earlier invocation) are reserved and skipped.

pub mod command;
pub mod process;
pub mod specs;

use futures::stream::{self, StreamExt};
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;
use thiserror::Error;

use crate::config::RunnerConfig;
use crate::models::{OutcomeCounts, RunOutcome, RunStatus, RunTarget};
use crate::utils::short_hash;

pub use command::RunnerCommand;
pub use process::{ProcessExit, ProcessReport, StreamOptions};
pub use specs::{select_spec_files, CheckCategory};

/// Errors raised while preparing a dispatch batch
///
/// These are configuration problems detected before any runner starts;
/// problems with individual runs are recorded in their [`RunOutcome`].
#[derive(Error, Debug)]
pub enum DispatchError {
    /// Spec directory missing or unreadable
    #[error("Cannot read spec directory {}: {source}", dir.display())]
    SpecDir {
        dir: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// No spec file left after applying exclusions
    #[error("No test spec files to run in {}", dir.display())]
    NoSpecFiles { dir: PathBuf },
}

/// Dispatches runner processes for targets
pub struct Dispatcher {
    command: RunnerCommand,
    specs: Vec<PathBuf>,
    result_prefix: String,
    concurrency: usize,
    tail_lines: usize,
    run_timeout: Option<Duration>,
    /// Attempts per target URL within this dispatcher
    attempts: Mutex<HashMap<(usize, String), u32>>,
    /// File stems of raw results that exist already
    reserved: HashSet<String>,
}

/// Whether a raw result file named `file_stem` was written for `run_stem`
///
/// Reporters may append a suffix (`<stem>_001`, `<stem>-retry`), but never
/// digits directly, so `..._1` does not claim `..._12`.
pub fn is_result_of(run_stem: &str, file_stem: &str) -> bool {
    match file_stem.strip_prefix(run_stem) {
        Some(rest) => !rest.starts_with(|c: char| c.is_ascii_digit()),
        None => false,
    }
}

impl Dispatcher {
    /// Create a dispatcher, selecting spec files with `excluded` categories
    /// removed
    ///
    /// # Errors
    ///
    /// Returns `DispatchError` if no spec file can be selected
    pub fn new(config: &RunnerConfig, excluded: &[CheckCategory]) -> Result<Self, DispatchError> {
        let specs = select_spec_files(config.working_dir.as_deref(), &config.spec_dir, excluded)?;
        tracing::info!(
            specs = specs.len(),
            excluded = ?excluded,
            "Selected test spec files"
        );
        Ok(Self::with_specs(config, specs))
    }

    /// Create a dispatcher with an explicit spec list
    pub fn with_specs(config: &RunnerConfig, specs: Vec<PathBuf>) -> Self {
        Self {
            command: RunnerCommand::from_config(config),
            specs,
            result_prefix: config.result_prefix.clone(),
            concurrency: config.concurrency.max(1),
            tail_lines: config.output_tail_lines,
            run_timeout: config.run_timeout(),
            attempts: Mutex::new(HashMap::new()),
            reserved: HashSet::new(),
        }
    }

    /// Never hand out a stem that would claim one of these existing raw files
    pub fn with_reserved_stems(mut self, stems: impl IntoIterator<Item = String>) -> Self {
        self.reserved.extend(stems);
        self
    }

    /// Spec files handed to every run
    pub fn specs(&self) -> &[PathBuf] {
        &self.specs
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Raw result stem for the next attempt on `target`
    pub fn next_stem(&self, target: &RunTarget) -> String {
        let base = format!(
            "{}_{:04}_{}",
            self.result_prefix,
            target.index,
            short_hash(&target.url, 12)
        );
        let Ok(mut attempts) = self.attempts.lock() else {
            return format!("{base}_1");
        };
        let counter = attempts
            .entry((target.index, target.url.clone()))
            .or_insert(0);
        loop {
            *counter += 1;
            let stem = format!("{base}_{counter}");
            if !self.reserved.iter().any(|file| is_result_of(&stem, file)) {
                return stem;
            }
        }
    }

    /// Run the test suites against one target
    pub async fn dispatch(&self, target: &RunTarget) -> RunOutcome {
        self.dispatch_with_label(target, None).await
    }

    async fn dispatch_with_label(&self, target: &RunTarget, label: Option<String>) -> RunOutcome {
        let stem = self.next_stem(target);
        tracing::info!(index = target.index, url = %target.url, stem = %stem, "Running tests");

        let command = self.command.build(target, &self.specs, &stem);
        let options = StreamOptions {
            label,
            tail_lines: self.tail_lines,
            timeout: self.run_timeout,
        };
        let report = process::supervise(command, &options).await;

        let status = match report.exit {
            ProcessExit::Exited(Some(0)) => RunStatus::Success,
            ProcessExit::Exited(code) => RunStatus::Failure { exit_code: code },
            ProcessExit::SpawnFailed(reason) => RunStatus::ProcessError {
                reason: format!("failed to start {}: {reason}", self.command.program()),
            },
            ProcessExit::TimedOut(limit) => RunStatus::ProcessError {
                reason: format!("timed out after {}s", limit.as_secs()),
            },
            ProcessExit::WaitFailed(reason) => RunStatus::ProcessError { reason },
        };

        match &status {
            RunStatus::Success => {
                tracing::info!(url = %target.url, duration_ms = report.duration_ms, "Tests completed successfully");
            }
            RunStatus::Failure { exit_code } => {
                tracing::warn!(url = %target.url, exit_code = ?exit_code, "Runner exited with failures");
            }
            RunStatus::ProcessError { reason } => {
                tracing::error!(url = %target.url, reason = %reason, "Runner process error");
            }
        }

        RunOutcome {
            target: target.clone(),
            status,
            raw_output_stem: stem,
            output_tail: report.tail,
            duration_ms: report.duration_ms,
        }
    }

    /// Run every target, returning one outcome per target in target order
    pub async fn dispatch_all(&self, targets: &[RunTarget]) -> Vec<RunOutcome> {
        let total = targets.len();
        let labelled = self.concurrency > 1;
        tracing::info!(targets = total, concurrency = self.concurrency, "Dispatching test runs");

        let outcomes: Vec<RunOutcome> = stream::iter(targets.iter().enumerate())
            .map(|(position, target)| {
                let label = labelled.then(|| format!("[{}/{}]", position + 1, total));
                self.dispatch_with_label(target, label)
            })
            .buffered(self.concurrency)
            .collect()
            .await;

        let counts = OutcomeCounts::from_outcomes(&outcomes);
        tracing::info!(
            total = counts.total,
            success = counts.success,
            failure = counts.failure,
            process_error = counts.process_error,
            "All test runs finished"
        );

        outcomes
    }
}
