//! HTML rendering and publishing
//!
//! The merged report is rendered with Handlebars into
//! `<branch dir>/<report name>.html` and then copied into the public upload
//! directory. Rendering and publishing fail with distinct errors so callers
//! can tell a broken template from an unwritable upload directory.

use handlebars::Handlebars;
use serde::Serialize;
use serde_json::Value;
use std::path::{Path, PathBuf};

use super::model::{MergedReport, MergedReportFile};
use super::{PublishError, RenderError};
use crate::config::ReportConfig;
use crate::models::PublishedArtifact;

const TEMPLATE_NAME: &str = "report";
const DEFAULT_TEMPLATE: &str = include_str!("../../templates/report.hbs");

#[derive(Debug, Serialize)]
struct TestRow {
    suite: String,
    title: String,
    state: String,
    duration: u64,
    error: Option<String>,
}

#[derive(Debug, Serialize)]
struct RunRow {
    position: usize,
    url: String,
    status: &'static str,
    detail: String,
}

#[derive(Debug, Serialize)]
struct ReportView<'a> {
    title: String,
    summary: String,
    all_passed: bool,
    branch: &'a str,
    commit: &'a str,
    timestamp: &'a str,
    stats: &'a super::model::ReportStats,
    runs: Vec<RunRow>,
    tests: Vec<TestRow>,
}

fn collect_tests(suite: &Value, parent: &str, rows: &mut Vec<TestRow>) {
    let title = suite["title"].as_str().unwrap_or_default();
    let path = match (parent.is_empty(), title.is_empty()) {
        (true, _) => title.to_string(),
        (false, true) => parent.to_string(),
        (false, false) => format!("{parent} > {title}"),
    };

    if let Some(tests) = suite["tests"].as_array() {
        for test in tests {
            rows.push(TestRow {
                suite: path.clone(),
                title: test["title"].as_str().unwrap_or_default().to_string(),
                state: test["state"].as_str().unwrap_or("pending").to_string(),
                duration: test["duration"].as_u64().unwrap_or(0),
                error: test["err"]["message"].as_str().map(str::to_string),
            });
        }
    }

    if let Some(children) = suite["suites"].as_array() {
        for child in children {
            collect_tests(child, &path, rows);
        }
    }
}

/// Renders merged reports and publishes them
pub struct ReportRenderer {
    handlebars: Handlebars<'static>,
    public_dir: PathBuf,
}

impl ReportRenderer {
    /// Renderer using the built-in template
    pub fn new(public_dir: impl Into<PathBuf>) -> Result<Self, RenderError> {
        Self::with_template_source(public_dir, DEFAULT_TEMPLATE)
    }

    /// Renderer using template source text
    pub fn with_template_source(
        public_dir: impl Into<PathBuf>,
        source: &str,
    ) -> Result<Self, RenderError> {
        let mut handlebars = Handlebars::new();
        handlebars.register_template_string(TEMPLATE_NAME, source)?;
        Ok(Self {
            handlebars,
            public_dir: public_dir.into(),
        })
    }

    pub fn from_config(config: &ReportConfig) -> Result<Self, RenderError> {
        match &config.template {
            Some(path) => {
                let source = std::fs::read_to_string(path).map_err(|source| RenderError::Io {
                    path: path.clone(),
                    source,
                })?;
                Self::with_template_source(&config.public_dir, &source)
            }
            None => Self::new(&config.public_dir),
        }
    }

    /// Render the report to an HTML string
    pub fn render_html(&self, report: &MergedReport) -> Result<String, RenderError> {
        let mut tests = Vec::new();
        for result in &report.results {
            collect_tests(result, "", &mut tests);
        }

        let runs = report
            .runs
            .iter()
            .map(|outcome| RunRow {
                position: outcome.target.index + 1,
                url: outcome.target.url.clone(),
                status: outcome.status.as_str(),
                detail: outcome.status.to_string(),
            })
            .collect();

        let view = ReportView {
            title: format!(
                "Site quality report {} ({})",
                report.identity.branch, report.identity.commit
            ),
            summary: report.stats.summary(),
            all_passed: report.stats.all_passed(),
            branch: &report.identity.branch,
            commit: &report.identity.commit,
            timestamp: &report.identity.timestamp,
            stats: &report.stats,
            runs,
            tests,
        };

        Ok(self.handlebars.render(TEMPLATE_NAME, &view)?)
    }

    /// Write `<report name>.html` next to the merged JSON
    pub fn render(&self, merged: &MergedReportFile) -> Result<PathBuf, RenderError> {
        let html = self.render_html(&merged.report)?;
        let path = merged
            .dir()
            .join(format!("{}.html", merged.report.identity.report_name()));
        std::fs::write(&path, html).map_err(|source| RenderError::Io {
            path: path.clone(),
            source,
        })?;
        tracing::info!(path = %path.display(), "Rendered HTML report");
        Ok(path)
    }

    /// Copy a rendered report into the public directory
    pub fn publish(&self, local_path: &Path, report_name: &str) -> Result<PublishedArtifact, PublishError> {
        std::fs::create_dir_all(&self.public_dir).map_err(|source| PublishError::CreateDir {
            dir: self.public_dir.clone(),
            source,
        })?;

        let file_name = local_path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| format!("{report_name}.html").into());
        let public_path = self.public_dir.join(file_name);

        std::fs::copy(local_path, &public_path).map_err(|source| PublishError::Copy {
            from: local_path.to_path_buf(),
            to: public_path.clone(),
            source,
        })?;
        tracing::info!(path = %public_path.display(), "Published report");

        Ok(PublishedArtifact {
            report_name: report_name.to_string(),
            local_path: local_path.to_path_buf(),
            public_path,
        })
    }

    /// Render then publish
    pub fn render_and_publish(
        &self,
        merged: &MergedReportFile,
    ) -> crate::Result<PublishedArtifact> {
        let local = self.render(merged)?;
        Ok(self.publish(&local, &merged.report.identity.report_name())?)
    }
}
