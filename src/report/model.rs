//! Report documents
//!
//! Raw per-run files and the merged report share the mochawesome JSON
//! layout (`stats`, `results`, `meta`). Suites inside `results` are kept as
//! opaque JSON so nothing the runner wrote is lost in the merge.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::path::PathBuf;

use crate::models::{RunIdentity, RunOutcome};

/// Counters of a mochawesome report
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReportStats {
    pub suites: u64,
    pub tests: u64,
    pub passes: u64,
    pub pending: u64,
    pub failures: u64,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub duration: u64,
    pub tests_registered: u64,
    pub pass_percent: f64,
    pub pending_percent: f64,
    pub other: u64,
    pub has_other: bool,
    pub skipped: u64,
    pub has_skipped: bool,
}

fn percent(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    ((part as f64 / whole as f64) * 10_000.0).round() / 100.0
}

impl ReportStats {
    /// Add another report's counters to this one
    pub fn absorb(&mut self, other: &ReportStats) {
        self.suites += other.suites;
        self.tests += other.tests;
        self.passes += other.passes;
        self.pending += other.pending;
        self.failures += other.failures;
        self.duration += other.duration;
        self.tests_registered += other.tests_registered;
        self.other += other.other;
        self.skipped += other.skipped;

        self.start = match (self.start, other.start) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
        self.end = match (self.end, other.end) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, b) => a.or(b),
        };

        self.refresh_derived();
    }

    /// Recompute percentages and flags from the counters
    pub fn refresh_derived(&mut self) {
        self.pass_percent = percent(
            self.passes,
            self.tests_registered.saturating_sub(self.pending),
        );
        self.pending_percent = percent(self.pending, self.tests_registered);
        self.has_other = self.other > 0;
        self.has_skipped = self.skipped > 0;
    }

    /// `"<passes>/<tests> passed"`
    pub fn summary(&self) -> String {
        format!("{}/{} passed", self.passes, self.tests)
    }

    pub fn all_passed(&self) -> bool {
        self.tests > 0 && self.passes == self.tests
    }
}

/// One raw result file as written by the runner
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawReport {
    pub stats: ReportStats,
    pub results: Vec<Value>,
    pub meta: Option<Value>,
}

/// All runs of one pipeline invocation merged into one document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergedReport {
    pub identity: RunIdentity,
    pub stats: ReportStats,
    pub results: Vec<Value>,
    /// One entry per dispatched target, in dispatch order
    #[serde(default)]
    pub runs: Vec<RunOutcome>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Value>,
}

impl MergedReport {
    /// Load a merged report from disk
    pub fn load(path: &std::path::Path) -> std::io::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }
}

/// A merged report together with where it was written
#[derive(Debug, Clone)]
pub struct MergedReportFile {
    pub report: MergedReport,
    pub path: PathBuf,
}

impl MergedReportFile {
    /// Directory the merged JSON lives in (the branch directory)
    pub fn dir(&self) -> PathBuf {
        self.path
            .parent()
            .map(|p| p.to_path_buf())
            .unwrap_or_default()
    }
}

/// Failed suite standing in for a target that left no raw result
///
/// `title` names what went wrong; the single failed test is titled with
/// the target URL and carries `reason` as its error message.
pub(crate) fn missing_results_suite(title: &str, url: &str, reason: &str) -> Value {
    let suite_id = uuid::Uuid::new_v4().to_string();
    let test_id = uuid::Uuid::new_v4().to_string();
    json!({
        "uuid": suite_id,
        "title": title,
        "fullFile": "",
        "file": "",
        "beforeHooks": [],
        "afterHooks": [],
        "tests": [{
            "title": url,
            "fullTitle": format!("{title} {url}"),
            "timedOut": false,
            "duration": 0,
            "state": "failed",
            "speed": null,
            "pass": false,
            "fail": true,
            "pending": false,
            "context": null,
            "code": "",
            "err": { "message": reason },
            "uuid": test_id,
            "parentUUID": suite_id,
            "isHook": false,
            "skipped": false
        }],
        "suites": [],
        "passes": [],
        "failures": [test_id],
        "pending": [],
        "skipped": [],
        "duration": 0,
        "root": true,
        "rootEmpty": false,
        "_timeout": 0
    })
}
