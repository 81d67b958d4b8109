//! Stage failures and what they leave behind

use chrono::{TimeZone, Utc};
use sitesweep::error::{ErrorCategory, SitesweepErrorTrait};
use sitesweep::models::RunIdentity;
use sitesweep::notifications::channels::webhook::WebhookConfig;
use sitesweep::pipeline::{Pipeline, PipelineOptions, TargetSource};
use sitesweep::report::MergeError;
use sitesweep::Error;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::fixtures::{identity, SPEC_FILES};
use crate::common::{shell_runner_config, write_specs, RECORDING_RUNNER};

fn urls(urls: &[&str]) -> PipelineOptions {
    PipelineOptions {
        source: Some(TargetSource::Urls(urls.iter().map(|u| u.to_string()).collect())),
        skip_notify: true,
        ..Default::default()
    }
}

fn one_url() -> PipelineOptions {
    urls(&["https://site.test/"])
}

fn entries_in(dir: &std::path::Path) -> usize {
    std::fs::read_dir(dir)
        .map(|entries| entries.filter_map(|e| e.ok()).count())
        .unwrap_or(0)
}

/// Nothing to merge when no runner ever started
#[tokio::test]
async fn test_missing_runner_fails_merge() {
    let root = tempfile::tempdir().unwrap();
    write_specs(root.path(), SPEC_FILES);

    let mut config = shell_runner_config(root.path(), RECORDING_RUNNER);
    config.runner.program = "/nonexistent/sitesweep-runner".to_string();

    let err = Pipeline::new(config)
        .with_identity(identity())
        .run(&one_url())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Merge(MergeError::NoRawResults { .. })), "{err}");
    assert_eq!(err.category(), ErrorCategory::Storage);
    assert_eq!(entries_in(&root.path().join("reports/main")), 0);
}

/// A second report with the same identity is refused and the new raw
/// results stay in place
#[tokio::test]
async fn test_existing_report_is_not_overwritten() {
    let root = tempfile::tempdir().unwrap();
    write_specs(root.path(), SPEC_FILES);
    let config = shell_runner_config(root.path(), RECORDING_RUNNER);

    let first = Pipeline::new(config.clone())
        .with_identity(identity())
        .run(&one_url())
        .await
        .unwrap();
    let original = std::fs::read(&first.report_path).unwrap();

    let err = Pipeline::new(config)
        .with_identity(identity())
        .run(&one_url())
        .await
        .unwrap_err();

    match err {
        Error::Merge(MergeError::ReportExists { path }) => assert_eq!(path, first.report_path),
        other => panic!("expected ReportExists, got {other}"),
    }
    assert_eq!(std::fs::read(&first.report_path).unwrap(), original);
    assert_eq!(entries_in(&root.path().join("raw")), 1);
}

/// Results kept after a failed merge are neither merged into nor
/// overwritten by the next run
#[tokio::test]
async fn test_leftover_results_do_not_leak_into_next_run() {
    let root = tempfile::tempdir().unwrap();
    write_specs(root.path(), SPEC_FILES);
    let config = shell_runner_config(root.path(), RECORDING_RUNNER);

    Pipeline::new(config.clone())
        .with_identity(identity())
        .run(&one_url())
        .await
        .unwrap();

    let err = Pipeline::new(config.clone())
        .with_identity(identity())
        .run(&urls(&["https://site.test/", "https://site.test/fail"]))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Merge(MergeError::ReportExists { .. })), "{err}");
    let raw_dir = root.path().join("raw");
    let stale: Vec<_> = std::fs::read_dir(&raw_dir)
        .unwrap()
        .map(|e| e.unwrap().path())
        .collect();
    assert_eq!(stale.len(), 2);

    let later = RunIdentity::new(
        "main",
        "abc1234",
        Utc.with_ymd_and_hms(2024, 5, 1, 11, 0, 0).unwrap(),
    );
    let summary = Pipeline::new(config)
        .with_identity(later)
        .run(&one_url())
        .await
        .unwrap();

    assert_eq!(summary.summary, "1/1 passed");
    assert_eq!(entries_in(&raw_dir), 2);
    for path in &stale {
        assert!(path.exists(), "{} was consumed", path.display());
    }
}

/// Sitemap failures stop the run before any runner starts
#[tokio::test]
async fn test_sitemap_failure_stops_before_dispatch() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/sitemap.xml"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let root = tempfile::tempdir().unwrap();
    write_specs(root.path(), SPEC_FILES);
    let mut config = shell_runner_config(root.path(), RECORDING_RUNNER);
    config.sitemap.url = Some(format!("{}/sitemap.xml", server.uri()));

    let err = Pipeline::new(config)
        .with_identity(identity())
        .run(&PipelineOptions::default())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Sitemap(_)), "{err}");
    assert!(!root.path().join("raw").exists());
    assert!(!root.path().join("reports").exists());
}

/// Excluding every category is caught before the sitemap is fetched
#[tokio::test]
async fn test_no_spec_files_fails_before_network() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let root = tempfile::tempdir().unwrap();
    write_specs(root.path(), &["visual.cy.js"]);
    let mut config = shell_runner_config(root.path(), RECORDING_RUNNER);
    config.sitemap.url = Some(format!("{}/sitemap.xml", server.uri()));

    let options = PipelineOptions {
        exclude: vec![sitesweep::dispatcher::CheckCategory::Visual],
        ..Default::default()
    };
    let err = Pipeline::new(config)
        .with_identity(identity())
        .run(&options)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Dispatch(_)), "{err}");
    assert_eq!(err.category(), ErrorCategory::Config);
}

/// A failed publish keeps the merged report but sends no notification
#[tokio::test]
async fn test_publish_failure_skips_notification() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let root = tempfile::tempdir().unwrap();
    write_specs(root.path(), SPEC_FILES);
    let blocker = root.path().join("blocker");
    std::fs::write(&blocker, "not a directory").unwrap();

    let mut config = shell_runner_config(root.path(), RECORDING_RUNNER);
    config.report.public_dir = blocker.join("public");
    config.notify.webhook = Some(WebhookConfig::new(format!("{}/hook", server.uri())));

    let options = PipelineOptions {
        skip_notify: false,
        ..one_url()
    };
    let err = Pipeline::new(config)
        .with_identity(identity())
        .run(&options)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Publish(_)), "{err}");
    assert_eq!(entries_in(&root.path().join("reports/main")), 2);
}
