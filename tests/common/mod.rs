//! Common test utilities

#![allow(dead_code)]

use std::path::Path;

use sitesweep::config::{Config, SitemapConfig};

/// `<urlset>` with the given page URLs
pub fn urlset(urls: &[&str]) -> String {
    let entries: String = urls
        .iter()
        .map(|u| format!("  <url><loc>{u}</loc></url>\n"))
        .collect();
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
         <urlset xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\">\n{entries}</urlset>"
    )
}

/// `<sitemapindex>` with the given child sitemap URLs
pub fn sitemap_index(children: &[&str]) -> String {
    let entries: String = children
        .iter()
        .map(|u| format!("  <sitemap><loc>{u}</loc></sitemap>\n"))
        .collect();
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
         <sitemapindex xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\">\n{entries}</sitemapindex>"
    )
}

/// Sitemap settings suitable for a local mock server
pub fn fast_sitemap_config() -> SitemapConfig {
    SitemapConfig {
        requests_per_second: 1000,
        request_timeout_secs: 5,
        ..SitemapConfig::default()
    }
}

/// Spec directory containing the given (empty) spec files
pub fn write_specs(root: &Path, files: &[&str]) {
    let dir = root.join("cypress/e2e");
    std::fs::create_dir_all(&dir).unwrap();
    for file in files {
        std::fs::write(dir.join(file), "// spec").unwrap();
    }
}

/// Raw mochawesome result for one run
pub fn raw_result(title: &str, passed: bool) -> String {
    let state = if passed { "passed" } else { "failed" };
    serde_json::json!({
        "stats": {
            "suites": 1,
            "tests": 1,
            "passes": u64::from(passed),
            "failures": u64::from(!passed),
            "pending": 0,
            "testsRegistered": 1,
            "start": "2024-05-01T10:00:00.000Z",
            "end": "2024-05-01T10:00:01.000Z",
            "duration": 1000
        },
        "results": [{
            "title": title,
            "tests": [{ "title": "page loads", "state": state, "duration": 1000 }],
            "suites": []
        }]
    })
    .to_string()
}

/// Configuration rooted in `root` whose runner is a shell script
///
/// The script sees the usual runner environment (`SITESWEEP_TARGET_URL`,
/// `SITESWEEP_RESULT_STEM`) and runs with `root` as working directory.
pub fn shell_runner_config(root: &Path, script: &str) -> Config {
    let mut config = Config::default();
    config.runner.program = "sh".to_string();
    config.runner.args = vec!["-c".to_string(), script.to_string()];
    config.runner.working_dir = Some(root.to_path_buf());
    config.report.raw_dir = root.join("raw");
    config.report.output_dir = root.join("reports");
    config.report.public_dir = root.join("public");
    config.report.repo_dir = root.to_path_buf();
    config.sitemap = fast_sitemap_config();
    config
}

/// Runner script writing one raw result per run; URLs containing `fail`
/// record a failed test and exit 1
pub const RECORDING_RUNNER: &str = r#"
mkdir -p raw
case "$SITESWEEP_TARGET_URL" in
  *fail*) state=false; code=1 ;;
  *) state=true; code=0 ;;
esac
if [ "$state" = true ]; then passes=1; failures=0; s=passed; else passes=0; failures=1; s=failed; fi
cat > "raw/$SITESWEEP_RESULT_STEM.json" <<EOF
{"stats":{"suites":1,"tests":1,"passes":$passes,"failures":$failures,"pending":0,"testsRegistered":1,"duration":5},
 "results":[{"title":"$SITESWEEP_TARGET_URL","tests":[{"title":"checks","state":"$s","duration":5}],"suites":[]}]}
EOF
echo "ran $SITESWEEP_TARGET_URL"
exit $code
"#;
