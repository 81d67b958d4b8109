use anyhow::{Context, Result};

use sitesweep::config::Config;
use sitesweep::dispatcher::CheckCategory;
use sitesweep::pipeline::{Pipeline, PipelineOptions, TargetSource};
use sitesweep::sitemap::parse_url_list;

pub struct RunParams {
    pub sitemap: Option<String>,
    pub urls: Option<String>,
    pub filter: Option<String>,
    pub exclude: Vec<CheckCategory>,
    pub quick: bool,
    pub concurrency: Option<usize>,
    pub no_notify: bool,
}

pub async fn run(mut config: Config, params: RunParams) -> Result<()> {
    if let Some(concurrency) = params.concurrency {
        anyhow::ensure!(concurrency > 0, "--concurrency must be greater than 0");
        config.runner.concurrency = concurrency;
    }

    let source = match (params.sitemap, params.urls) {
        (Some(url), _) => Some(TargetSource::Sitemap(url)),
        (None, Some(list)) => Some(TargetSource::Urls(parse_url_list(&list))),
        (None, None) => None,
    };

    let mut exclude = params.exclude;
    if params.quick {
        exclude.extend(CheckCategory::QUICK_EXCLUDES);
    }

    let options = PipelineOptions {
        source,
        filter: params.filter,
        exclude,
        skip_notify: params.no_notify,
    };

    let summary = Pipeline::new(config)
        .run(&options)
        .await
        .context("Pipeline failed")?;

    println!();
    println!("Run {}", summary.identity);
    println!("================================");
    println!(
        "  Targets: {} ({} passed, {} failed, {} could not run)",
        summary.counts.total,
        summary.counts.success,
        summary.counts.failure,
        summary.counts.process_error
    );
    for outcome in summary.outcomes.iter().filter(|o| !o.status.is_success()) {
        println!("    {} -> {}", outcome.target.url, outcome.status);
    }
    println!("  Result: {}", summary.summary);
    println!("  Report: {}", summary.report_path.display());
    println!("  Published: {}", summary.artifact.public_path.display());
    for delivery in &summary.deliveries {
        println!("  {delivery}");
    }

    Ok(())
}
