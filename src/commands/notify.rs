use anyhow::{Context, Result};
use std::path::PathBuf;

use sitesweep::config::Config;
use sitesweep::models::PublishedArtifact;
use sitesweep::notifications::Notifier;
use sitesweep::report::{current_branch, latest_html_report, MergedReport, ReportRenderer};
use sitesweep::utils::sanitize_filename;

/// Announce an already rendered report
///
/// Without `--report`, the newest `*.html` in `<output_dir>/<branch>` is used.
/// The merged JSON is expected next to it under the same name.
pub async fn notify(config: Config, report: Option<PathBuf>) -> Result<()> {
    let html = match report {
        Some(path) => path,
        None => {
            let branch = current_branch(&config.report.repo_dir)
                .await
                .context("Cannot determine current branch")?;
            let dir = config.report.output_dir.join(sanitize_filename(&branch));
            latest_html_report(&dir)
                .with_context(|| format!("Cannot list reports in {}", dir.display()))?
                .with_context(|| format!("No rendered report found in {}", dir.display()))?
        }
    };

    let json = html.with_extension("json");
    let merged = MergedReport::load(&json)
        .with_context(|| format!("Cannot read merged report {}", json.display()))?;

    let report_name = html
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| merged.identity.report_name());
    let public_path = config
        .report
        .public_dir
        .join(html.file_name().context("Report path has no file name")?);

    let artifact = if public_path.exists() {
        PublishedArtifact {
            report_name,
            local_path: html.clone(),
            public_path,
        }
    } else {
        ReportRenderer::from_config(&config.report)?
            .publish(&html, &report_name)
            .context("Failed to publish report")?
    };

    let notifier = Notifier::from_config(&config.notify, &config.report);
    if notifier.is_empty() {
        println!("No notification channels configured.");
        return Ok(());
    }

    println!("Announcing {} ({})", html.display(), merged.stats.summary());
    for delivery in notifier.notify(&merged, &artifact).await {
        println!("  {delivery}");
    }

    Ok(())
}
