// Core data structures for sitesweep runs

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// HTTP basic-auth credentials for a protected site
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

// Keep the password out of logs.
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// One page to run the test suites against
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunTarget {
    /// Position in the resolved URL list (0-based)
    pub index: usize,
    pub url: String,
    #[serde(skip)]
    pub credentials: Option<Credentials>,
}

impl RunTarget {
    pub fn new(index: usize, url: impl Into<String>, credentials: Option<Credentials>) -> Self {
        Self {
            index,
            url: url.into(),
            credentials,
        }
    }

    /// Build targets from an ordered URL list, preserving order and duplicates
    pub fn from_urls(urls: Vec<String>, credentials: Option<Credentials>) -> Vec<Self> {
        urls.into_iter()
            .enumerate()
            .map(|(index, url)| Self::new(index, url, credentials.clone()))
            .collect()
    }
}

/// Terminal state of a dispatched test run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunStatus {
    /// Runner exited with code 0
    Success,
    /// Runner exited non-zero (or was terminated by a signal)
    Failure { exit_code: Option<i32> },
    /// Runner could not be started or supervised
    ProcessError { reason: String },
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failure { .. } => "failure",
            Self::ProcessError { .. } => "process-error",
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::Failure {
                exit_code: Some(code),
            } => write!(f, "failure (exit code {code})"),
            Self::Failure { exit_code: None } => write!(f, "failure (terminated by signal)"),
            Self::ProcessError { reason } => write!(f, "process-error: {reason}"),
        }
    }
}

/// Result of one dispatched test run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunOutcome {
    pub target: RunTarget,
    #[serde(flatten)]
    pub status: RunStatus,
    /// File stem the runner was asked to write its raw result under
    pub raw_output_stem: String,
    /// Last lines of combined stdout/stderr
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub output_tail: Vec<String>,
    pub duration_ms: u64,
}

/// Aggregate counts over a batch of outcomes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeCounts {
    pub total: usize,
    pub success: usize,
    pub failure: usize,
    pub process_error: usize,
}

impl OutcomeCounts {
    pub fn from_outcomes(outcomes: &[RunOutcome]) -> Self {
        let mut counts = Self {
            total: outcomes.len(),
            ..Default::default()
        };
        for outcome in outcomes {
            match outcome.status {
                RunStatus::Success => counts.success += 1,
                RunStatus::Failure { .. } => counts.failure += 1,
                RunStatus::ProcessError { .. } => counts.process_error += 1,
            }
        }
        counts
    }
}

/// Identity of a pipeline invocation: branch + commit + generation time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunIdentity {
    pub branch: String,
    pub commit: String,
    /// Filesystem-safe RFC 3339 timestamp (`:` and `.` replaced by `-`)
    pub timestamp: String,
}

impl RunIdentity {
    pub fn new(branch: impl Into<String>, commit: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self {
            branch: branch.into(),
            commit: commit.into(),
            timestamp: Self::format_timestamp(at),
        }
    }

    /// `2024-05-01T10:11:12.123Z` -> `2024-05-01T10-11-12-123Z`
    pub fn format_timestamp(at: DateTime<Utc>) -> String {
        at.to_rfc3339_opts(SecondsFormat::Millis, true)
            .replace([':', '.'], "-")
    }

    /// Base name shared by the merged JSON and the rendered HTML
    pub fn report_name(&self) -> String {
        format!("{}_{}", self.timestamp, self.commit)
    }
}

impl fmt::Display for RunIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{} ({})", self.branch, self.commit, self.timestamp)
    }
}

/// Rendered report copied to a servable location
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishedArtifact {
    pub report_name: String,
    /// Rendered file next to the merged JSON
    pub local_path: PathBuf,
    /// Copy inside the public upload directory
    pub public_path: PathBuf,
}

impl PublishedArtifact {
    pub fn file_name(&self) -> String {
        self.public_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| format!("{}.html", self.report_name))
    }

    /// Shareable link, e.g. `https://example.com/wp-content/uploads/cypress-reports/<file>`
    pub fn public_url(&self, domain: &str, url_path: &str) -> String {
        let domain = domain
            .trim_start_matches("https://")
            .trim_start_matches("http://")
            .trim_end_matches('/');
        let url_path = url_path.trim_matches('/');
        if url_path.is_empty() {
            format!("https://{domain}/{}", self.file_name())
        } else {
            format!("https://{domain}/{url_path}/{}", self.file_name())
        }
    }
}
