//! Complete pipeline runs against a mock sitemap and a shell runner

use sitesweep::dispatcher::CheckCategory;
use sitesweep::models::RunStatus;
use sitesweep::notifications::channels::webhook::WebhookConfig;
use sitesweep::pipeline::{Pipeline, PipelineOptions, TargetSource};
use sitesweep::report::MergedReport;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::fixtures::{identity, mount_site, SPEC_FILES};
use crate::common::{shell_runner_config, write_specs, RECORDING_RUNNER};

const REPORT_NAME: &str = "2024-05-01T10-00-00-000Z_abc1234";

#[tokio::test]
async fn test_full_pipeline_with_webhook() {
    let server = MockServer::start().await;
    let sitemap = mount_site(&server, ["home", "fail-page"], ["about", "contact"]).await;
    Mock::given(method("POST"))
        .and(path("/hook"))
        .and(body_json(serde_json::json!({
            "text": format!(
                "3/4 passed. Please check the attached file. https://example.com/reports/{REPORT_NAME}.html"
            )
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let root = tempfile::tempdir().unwrap();
    write_specs(root.path(), SPEC_FILES);

    let mut config = shell_runner_config(root.path(), RECORDING_RUNNER);
    config.sitemap.url = Some(sitemap);
    config.report.public_url_path = "reports".to_string();
    config.notify.domain = Some("example.com".to_string());
    config.notify.webhook = Some(WebhookConfig::new(format!("{}/hook", server.uri())));

    let summary = Pipeline::new(config)
        .with_identity(identity())
        .run(&PipelineOptions::default())
        .await
        .unwrap();

    let urls: Vec<_> = summary.outcomes.iter().map(|o| o.target.url.as_str()).collect();
    assert_eq!(
        urls,
        vec![
            "https://site.test/home",
            "https://site.test/fail-page",
            "https://site.test/about",
            "https://site.test/contact",
        ]
    );
    assert_eq!(summary.outcomes[1].status, RunStatus::Failure { exit_code: Some(1) });
    assert_eq!(summary.counts.success, 3);
    assert_eq!(summary.counts.failure, 1);
    assert_eq!(summary.summary, "3/4 passed");

    let branch_dir = root.path().join("reports/main");
    assert_eq!(summary.report_path, branch_dir.join(format!("{REPORT_NAME}.json")));
    assert!(summary.artifact.local_path.is_file());
    assert_eq!(
        summary.artifact.public_path,
        root.path().join("public").join(format!("{REPORT_NAME}.html"))
    );
    assert!(summary.artifact.public_path.is_file());
    assert!(!root.path().join("raw").exists());

    let merged = MergedReport::load(&summary.report_path).unwrap();
    assert_eq!(merged.stats.tests, 4);
    assert_eq!(merged.stats.failures, 1);
    assert_eq!(merged.runs.len(), 4);

    let html = std::fs::read_to_string(&summary.artifact.public_path).unwrap();
    assert!(html.contains("https://site.test/fail-page"));

    assert_eq!(summary.deliveries.len(), 1);
    assert!(summary.deliveries[0].success, "{}", summary.deliveries[0]);
}

/// A run that never produces results is counted as a failed test
#[tokio::test]
async fn test_timed_out_run_is_counted_as_failure() {
    let root = tempfile::tempdir().unwrap();
    write_specs(root.path(), SPEC_FILES);

    let script = format!(
        "case \"$SITESWEEP_TARGET_URL\" in *hang*) exec sleep 5;; esac\n{RECORDING_RUNNER}"
    );
    let mut config = shell_runner_config(root.path(), &script);
    config.runner.concurrency = 2;
    config.runner.run_timeout_secs = Some(1);

    let options = PipelineOptions {
        source: Some(TargetSource::Urls(vec![
            "https://site.test/one".to_string(),
            "https://site.test/hang".to_string(),
            "https://site.test/two".to_string(),
        ])),
        skip_notify: true,
        ..Default::default()
    };
    let summary = Pipeline::new(config)
        .with_identity(identity())
        .run(&options)
        .await
        .unwrap();

    match &summary.outcomes[1].status {
        RunStatus::ProcessError { reason } => assert!(reason.contains("timed out"), "{reason}"),
        other => panic!("expected process error, got {other:?}"),
    }
    assert_eq!(summary.counts.process_error, 1);
    assert_eq!(summary.summary, "2/3 passed");
    assert!(summary.deliveries.is_empty());

    let html = std::fs::read_to_string(&summary.artifact.local_path).unwrap();
    assert!(html.contains("Runner failed to start for https://site.test/hang"));
}

/// Excluded categories never reach the runner; credentials travel via the
/// environment
#[tokio::test]
async fn test_exclusions_and_credentials_reach_runner() {
    let root = tempfile::tempdir().unwrap();
    write_specs(root.path(), SPEC_FILES);

    let script = format!(
        "echo \"{{specs}}\" > specs.txt\necho \"$CYPRESS_AUTH_USERNAME\" > user.txt\n{RECORDING_RUNNER}"
    );
    let mut config = shell_runner_config(root.path(), &script);
    config.runner.exclude = vec![CheckCategory::Seo];
    config.site.username = Some("admin".to_string());
    config.site.password = Some("s3cret".to_string());

    let options = PipelineOptions {
        source: Some(TargetSource::Urls(vec!["https://site.test/".to_string()])),
        exclude: vec![CheckCategory::Visual],
        skip_notify: true,
        ..Default::default()
    };
    let summary = Pipeline::new(config)
        .with_identity(identity())
        .run(&options)
        .await
        .unwrap();
    assert_eq!(summary.summary, "1/1 passed");

    let specs = std::fs::read_to_string(root.path().join("specs.txt")).unwrap();
    assert!(specs.contains("accessibility.cy.js"));
    assert!(specs.contains("brokenLinks.cy.js"));
    assert!(!specs.contains("seo.cy.js"));
    assert!(!specs.contains("visual.cy.js"));

    let user = std::fs::read_to_string(root.path().join("user.txt")).unwrap();
    assert_eq!(user.trim(), "admin");
}

/// Filtering happens after resolution and keeps sitemap order
#[tokio::test]
async fn test_filter_applies_to_resolved_urls() {
    let server = MockServer::start().await;
    let sitemap = mount_site(&server, ["blog/one", "about"], ["team", "blog/two"]).await;

    let root = tempfile::tempdir().unwrap();
    let mut config = shell_runner_config(root.path(), RECORDING_RUNNER);
    config.sitemap.url = Some(sitemap);

    let options = PipelineOptions {
        filter: Some("blog".to_string()),
        ..Default::default()
    };
    let targets = Pipeline::new(config).resolve_targets(&options).await.unwrap();

    let urls: Vec<_> = targets.iter().map(|t| t.url.as_str()).collect();
    assert_eq!(urls, vec!["https://site.test/blog/one", "https://site.test/blog/two"]);
    assert_eq!(targets[1].index, 1);
}

/// A runner that exits non-zero before its reporter writes anything still
/// counts as a failed test
#[tokio::test]
async fn test_crash_without_results_is_counted_as_failure() {
    let root = tempfile::tempdir().unwrap();
    write_specs(root.path(), SPEC_FILES);

    let script = format!(
        "case \"$SITESWEEP_TARGET_URL\" in *crash*) echo boom >&2; exit 1;; esac\n{RECORDING_RUNNER}"
    );
    let config = shell_runner_config(root.path(), &script);

    let options = PipelineOptions {
        source: Some(TargetSource::Urls(vec![
            "https://site.test/a".to_string(),
            "https://site.test/crash".to_string(),
            "https://site.test/b".to_string(),
        ])),
        skip_notify: true,
        ..Default::default()
    };
    let summary = Pipeline::new(config)
        .with_identity(identity())
        .run(&options)
        .await
        .unwrap();

    assert_eq!(summary.outcomes[1].status, RunStatus::Failure { exit_code: Some(1) });
    assert_eq!(summary.summary, "2/3 passed");

    let merged = MergedReport::load(&summary.report_path).unwrap();
    assert_eq!(merged.stats.failures, 1);
    assert!(!merged.stats.all_passed());

    let html = std::fs::read_to_string(&summary.artifact.local_path).unwrap();
    assert!(html.contains("No results recorded for https://site.test/crash"));
}
