//! Raw result merging
//!
//! The raw files written for this run's outcomes (matched by result stem)
//! are folded into one [`MergedReport`]: counters are summed, the time
//! window widened and the suites concatenated in file-name order. A target
//! that did not succeed and left no raw file gets a synthetic failed suite,
//! so every target is counted. Other `<prefix>*.json` files in the raw
//! directory belong to earlier invocations; they are skipped and kept.
//!
//! The merged report is written to
//! `<output_dir>/<branch>/<timestamp>_<commit>.json` and is never
//! overwritten. Raw results are removed only once the report is on disk.

use std::collections::HashSet;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use super::model::{missing_results_suite, MergedReport, MergedReportFile, RawReport, ReportStats};
use super::{identity, MergeError};
use crate::config::{ReportConfig, RunnerConfig};
use crate::dispatcher::is_result_of;
use crate::models::{RunIdentity, RunOutcome, RunStatus};
use crate::utils::sanitize_filename;

/// Merges raw per-run results into the branch report directory
#[derive(Debug, Clone)]
pub struct ReportMerger {
    raw_dir: PathBuf,
    output_dir: PathBuf,
    result_prefix: String,
    repo_dir: PathBuf,
}

impl ReportMerger {
    pub fn new(
        raw_dir: impl Into<PathBuf>,
        output_dir: impl Into<PathBuf>,
        result_prefix: impl Into<String>,
    ) -> Self {
        Self {
            raw_dir: raw_dir.into(),
            output_dir: output_dir.into(),
            result_prefix: result_prefix.into(),
            repo_dir: PathBuf::from("."),
        }
    }

    pub fn from_config(report: &ReportConfig, runner: &RunnerConfig) -> Self {
        Self {
            raw_dir: report.raw_dir.clone(),
            output_dir: report.output_dir.clone(),
            result_prefix: runner.result_prefix.clone(),
            repo_dir: report.repo_dir.clone(),
        }
    }

    pub fn with_repo_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.repo_dir = dir.into();
        self
    }

    pub fn raw_dir(&self) -> &Path {
        &self.raw_dir
    }

    /// Directory holding reports of `branch`
    pub fn branch_dir(&self, branch: &str) -> PathBuf {
        self.output_dir.join(sanitize_filename(branch))
    }

    /// Merge using the identity of the enclosing git repository
    pub async fn merge(&self, outcomes: &[RunOutcome]) -> Result<MergedReportFile, MergeError> {
        let identity = identity::current_identity(&self.repo_dir).await?;
        self.merge_with_identity(identity, outcomes)
    }

    /// Merge under an explicit identity
    ///
    /// With an empty `outcomes` slice every `<prefix>*.json` file is merged.
    ///
    /// # Errors
    ///
    /// - `MergeError::NoRawResults` if there is nothing to merge
    /// - `MergeError::InvalidRawFile` if a raw file is not a valid report
    /// - `MergeError::ReportExists` if a report with this identity exists
    ///
    /// On error no report file is created and the raw directory is kept.
    pub fn merge_with_identity(
        &self,
        identity: RunIdentity,
        outcomes: &[RunOutcome],
    ) -> Result<MergedReportFile, MergeError> {
        let (own, foreign) = self.partition_raw_files(outcomes)?;
        for path in &foreign {
            tracing::warn!(
                path = %path.display(),
                "Skipping raw result that belongs to no target of this run"
            );
        }
        if own.is_empty() {
            return Err(MergeError::NoRawResults {
                dir: self.raw_dir.clone(),
            });
        }
        tracing::info!(
            raw_dir = %self.raw_dir.display(),
            files = own.len(),
            skipped = foreign.len(),
            "Merging raw results"
        );

        let mut stats = ReportStats::default();
        let mut results = Vec::new();
        let mut meta = None;
        let mut reported: HashSet<&str> = HashSet::new();

        for path in &own {
            let raw = read_raw(path)?;
            stats.absorb(&raw.stats);
            results.extend(raw.results);
            if meta.is_none() {
                meta = raw.meta;
            }
            let file_stem = file_stem(path);
            if let Some(outcome) = outcomes
                .iter()
                .find(|o| is_result_of(&o.raw_output_stem, &file_stem))
            {
                reported.insert(outcome.raw_output_stem.as_str());
            }
        }

        for outcome in outcomes {
            if reported.contains(outcome.raw_output_stem.as_str()) {
                continue;
            }
            let url = &outcome.target.url;
            let suite = match &outcome.status {
                RunStatus::Success => {
                    tracing::warn!(
                        url = %url,
                        stem = %outcome.raw_output_stem,
                        "Run succeeded but wrote no results"
                    );
                    continue;
                }
                RunStatus::Failure { exit_code } => {
                    let exit = exit_code
                        .map_or_else(|| "a signal".to_string(), |c| format!("code {c}"));
                    missing_results_suite(
                        &format!("No results recorded for {url}"),
                        url,
                        &format!("runner exited with {exit} before writing results"),
                    )
                }
                RunStatus::ProcessError { reason } => {
                    missing_results_suite(&format!("Runner failed to start for {url}"), url, reason)
                }
            };
            results.push(suite);
            stats.absorb(&ReportStats {
                suites: 1,
                tests: 1,
                failures: 1,
                tests_registered: 1,
                ..Default::default()
            });
        }

        let report = MergedReport {
            identity,
            stats,
            results,
            runs: outcomes.to_vec(),
            meta,
        };

        let path = self.write_report(&report)?;
        tracing::info!(
            path = %path.display(),
            summary = %report.stats.summary(),
            "Merged report written"
        );

        self.remove_merged(&own, foreign.is_empty());

        Ok(MergedReportFile { report, path })
    }

    /// File stems of the raw results currently in the raw directory
    ///
    /// The dispatcher reserves these so a new run never reuses a stem that
    /// an earlier invocation left behind.
    pub fn leftover_stems(&self) -> Result<Vec<String>, MergeError> {
        Ok(self.prefixed_files()?.iter().map(|p| file_stem(p)).collect())
    }

    /// Split the prefixed raw files into this run's and everything else
    fn partition_raw_files(
        &self,
        outcomes: &[RunOutcome],
    ) -> Result<(Vec<PathBuf>, Vec<PathBuf>), MergeError> {
        let files = self.prefixed_files()?;
        if outcomes.is_empty() {
            return Ok((files, Vec::new()));
        }
        Ok(files.into_iter().partition(|path| {
            let stem = file_stem(path);
            outcomes
                .iter()
                .any(|o| is_result_of(&o.raw_output_stem, &stem))
        }))
    }

    /// `<raw_dir>/<prefix>*.json`, sorted by name; empty without a raw dir
    fn prefixed_files(&self) -> Result<Vec<PathBuf>, MergeError> {
        if !self.raw_dir.is_dir() {
            return Ok(Vec::new());
        }

        let pattern = format!(
            "{}/{}*.json",
            glob::Pattern::escape(&self.raw_dir.to_string_lossy()),
            glob::Pattern::escape(&self.result_prefix)
        );
        let entries = glob::glob(&pattern).map_err(|e| MergeError::Io {
            path: self.raw_dir.clone(),
            source: std::io::Error::new(std::io::ErrorKind::InvalidInput, e),
        })?;

        let mut files = Vec::new();
        for entry in entries {
            match entry {
                Ok(path) if path.is_file() => files.push(path),
                Ok(_) => {}
                Err(e) => {
                    let path = e.path().to_path_buf();
                    return Err(MergeError::Io {
                        path,
                        source: e.into_error(),
                    });
                }
            }
        }
        files.sort();
        Ok(files)
    }

    /// Remove merged raw files; the whole directory goes when nothing
    /// foreign is left in it
    fn remove_merged(&self, merged: &[PathBuf], whole_dir: bool) {
        if whole_dir {
            if let Err(e) = std::fs::remove_dir_all(&self.raw_dir) {
                tracing::warn!(
                    raw_dir = %self.raw_dir.display(),
                    error = %e,
                    "Failed to remove raw result directory"
                );
            }
            return;
        }

        for path in merged {
            if let Err(e) = std::fs::remove_file(path) {
                tracing::warn!(path = %path.display(), error = %e, "Failed to remove raw result");
            }
        }
        tracing::warn!(
            raw_dir = %self.raw_dir.display(),
            "Raw directory kept: it holds results of earlier runs"
        );
    }

    fn write_report(&self, report: &MergedReport) -> Result<PathBuf, MergeError> {
        let dir = self.branch_dir(&report.identity.branch);
        std::fs::create_dir_all(&dir).map_err(|source| MergeError::Io {
            path: dir.clone(),
            source,
        })?;

        let path = dir.join(format!("{}.json", report.identity.report_name()));
        let json = serde_json::to_vec_pretty(report)?;

        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(|source| match source.kind() {
                std::io::ErrorKind::AlreadyExists => MergeError::ReportExists { path: path.clone() },
                _ => MergeError::Io {
                    path: path.clone(),
                    source,
                },
            })?;

        if let Err(source) = file.write_all(&json).and_then(|_| file.flush()) {
            drop(file);
            let _ = std::fs::remove_file(&path);
            return Err(MergeError::Io { path, source });
        }

        Ok(path)
    }
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn read_raw(path: &Path) -> Result<RawReport, MergeError> {
    let content = std::fs::read_to_string(path).map_err(|source| MergeError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|e| MergeError::InvalidRawFile {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}
