//! Report merging, rendering and publishing
//!
//! After all runs finish, the raw per-run result files are merged into one
//! JSON report stored under the branch directory, rendered to HTML next to
//! it and copied into the public upload directory.

pub mod identity;
pub mod merge;
pub mod model;
pub mod render;

use std::path::{Path, PathBuf};
use std::time::SystemTime;
use thiserror::Error;

pub use identity::{current_branch, current_identity};
pub use merge::ReportMerger;
pub use model::{MergedReport, MergedReportFile, RawReport, ReportStats};
pub use render::ReportRenderer;

/// Errors raised while merging raw results
#[derive(Error, Debug)]
pub enum MergeError {
    /// Branch or commit could not be determined
    #[error("Cannot determine run identity: {reason}")]
    Identity { reason: String },

    /// Raw result directory missing or without result files
    #[error("No raw results to merge in {}", dir.display())]
    NoRawResults { dir: PathBuf },

    /// A raw result file could not be parsed
    #[error("Invalid raw result file {}: {reason}", path.display())]
    InvalidRawFile { path: PathBuf, reason: String },

    /// A report with the same identity already exists
    #[error("Report already exists: {}", path.display())]
    ReportExists { path: PathBuf },

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize merged report: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Errors raised while rendering the HTML report
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Report template error: {0}")]
    Template(String),

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors raised while copying the rendered report to the public directory
#[derive(Error, Debug)]
pub enum PublishError {
    #[error("Failed to create public directory {}: {source}", dir.display())]
    CreateDir {
        dir: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to copy {} to {}: {source}", from.display(), to.display())]
    Copy {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Most recently modified `*.html` report in `dir`
pub fn latest_html_report(dir: &Path) -> std::io::Result<Option<PathBuf>> {
    let pattern = format!("{}/*.html", glob::Pattern::escape(&dir.to_string_lossy()));
    let entries = glob::glob(&pattern)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;

    let mut latest: Option<(SystemTime, PathBuf)> = None;
    for entry in entries {
        let path = entry.map_err(|e| e.into_error())?;
        let modified = std::fs::metadata(&path)?.modified()?;
        // Equal times fall back to name order, newest name last.
        let newer = match &latest {
            Some((time, best)) => (modified, &path) > (*time, best),
            None => true,
        };
        if newer {
            latest = Some((modified, path));
        }
    }
    Ok(latest.map(|(_, path)| path))
}

impl From<handlebars::TemplateError> for RenderError {
    fn from(err: handlebars::TemplateError) -> Self {
        RenderError::Template(err.to_string())
    }
}

impl From<handlebars::RenderError> for RenderError {
    fn from(err: handlebars::RenderError) -> Self {
        RenderError::Template(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_latest_html_report_by_mtime() {
        let dir = tempfile::TempDir::new().unwrap();
        let older = dir.path().join("b_old.html");
        let newer = dir.path().join("a_new.html");
        std::fs::write(&older, "").unwrap();
        std::fs::write(&newer, "").unwrap();
        std::fs::write(dir.path().join("z.json"), "{}").unwrap();

        let now = SystemTime::now();
        std::fs::File::options()
            .write(true)
            .open(&older)
            .unwrap()
            .set_modified(now - Duration::from_secs(3600))
            .unwrap();
        std::fs::File::options()
            .write(true)
            .open(&newer)
            .unwrap()
            .set_modified(now)
            .unwrap();

        assert_eq!(latest_html_report(dir.path()).unwrap(), Some(newer));
    }

    #[test]
    fn test_latest_html_report_empty_dir() {
        let dir = tempfile::TempDir::new().unwrap();
        assert_eq!(latest_html_report(dir.path()).unwrap(), None);
    }
}
