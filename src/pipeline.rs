//! End-to-end run: resolve → dispatch → merge → render → notify
//!
//! Stages run strictly one after another. Resolution, merge and render
//! failures stop the pipeline; failing test runs and failing notification
//! channels are recorded and the pipeline carries on.

use std::path::PathBuf;
use tracing::Instrument;
use uuid::Uuid;

use crate::config::Config;
use crate::dispatcher::{CheckCategory, Dispatcher};
use crate::error::{Error, Result};
use crate::models::{OutcomeCounts, PublishedArtifact, RunIdentity, RunOutcome, RunTarget};
use crate::notifications::{DeliveryStatus, Notifier};
use crate::report::{MergedReportFile, ReportMerger, ReportRenderer};
use crate::sitemap::{filter_urls, SitemapResolver};
use crate::utils::extract_domain;

/// Where the URLs to test come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetSource {
    /// Resolve this sitemap (or sitemap index)
    Sitemap(String),
    /// Use these URLs as given
    Urls(Vec<String>),
}

/// Per-invocation options
#[derive(Debug, Clone, Default)]
pub struct PipelineOptions {
    /// Overrides `sitemap.url` from the configuration
    pub source: Option<TargetSource>,
    /// Keep only URLs containing this substring
    pub filter: Option<String>,
    /// Check categories to skip, on top of `runner.exclude`
    pub exclude: Vec<CheckCategory>,
    /// Skip the notification stage
    pub skip_notify: bool,
}

/// What one pipeline invocation produced
#[derive(Debug, Clone)]
pub struct PipelineSummary {
    pub invocation_id: Uuid,
    pub identity: RunIdentity,
    pub outcomes: Vec<RunOutcome>,
    pub counts: OutcomeCounts,
    pub report_path: PathBuf,
    pub artifact: PublishedArtifact,
    pub deliveries: Vec<DeliveryStatus>,
    /// `"<passes>/<tests> passed"` of the merged report
    pub summary: String,
}

/// Orchestrates the stages of one run
pub struct Pipeline {
    config: Config,
    identity: Option<RunIdentity>,
}

impl Pipeline {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            identity: None,
        }
    }

    /// Use a fixed run identity instead of asking git
    pub fn with_identity(mut self, identity: RunIdentity) -> Self {
        self.identity = Some(identity);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Ordered list of targets for this run
    ///
    /// # Errors
    ///
    /// Fails when no source is configured, when the sitemap cannot be
    /// resolved, or when no URL is left to test.
    pub async fn resolve_targets(&self, options: &PipelineOptions) -> Result<Vec<RunTarget>> {
        let source = match (&options.source, &self.config.sitemap.url) {
            (Some(source), _) => source.clone(),
            (None, Some(url)) => TargetSource::Sitemap(url.clone()),
            (None, None) => {
                return Err(Error::config(
                    "No sitemap URL configured (set sitemap.url, SITEMAP_URL or pass --sitemap/--urls)",
                ))
            }
        };

        let credentials = self.config.site.credentials();
        let mut urls = match source {
            TargetSource::Urls(urls) => {
                tracing::info!(count = urls.len(), "Using manual URL list");
                urls
            }
            TargetSource::Sitemap(url) => {
                match extract_domain(&url) {
                    Ok(host) => tracing::debug!(host = %host, "Sitemap host"),
                    Err(e) => tracing::debug!(error = %e, "Sitemap URL has no host"),
                }
                let resolver = SitemapResolver::new(&self.config.sitemap, credentials.clone())?;
                resolver.resolve(&url).await?
            }
        };

        if let Some(needle) = options.filter.as_deref() {
            let before = urls.len();
            urls = filter_urls(urls, needle);
            tracing::info!(filter = %needle, before, after = urls.len(), "Filtered URLs");
        }

        if urls.is_empty() {
            return Err(Error::config("No URLs to test"));
        }

        Ok(RunTarget::from_urls(urls, credentials))
    }

    /// Run every stage
    pub async fn run(&self, options: &PipelineOptions) -> Result<PipelineSummary> {
        let invocation_id = Uuid::new_v4();
        let span = tracing::info_span!("pipeline", invocation = %invocation_id);
        self.run_stages(invocation_id, options).instrument(span).await
    }

    async fn run_stages(
        &self,
        invocation_id: Uuid,
        options: &PipelineOptions,
    ) -> Result<PipelineSummary> {
        let mut excluded = self.config.runner.exclude.clone();
        for category in &options.exclude {
            if !excluded.contains(category) {
                excluded.push(*category);
            }
        }

        let merger = ReportMerger::from_config(&self.config.report, &self.config.runner);
        let leftovers = merger.leftover_stems()?;
        if !leftovers.is_empty() {
            tracing::warn!(
                raw_dir = %merger.raw_dir().display(),
                files = leftovers.len(),
                "Raw directory holds results of an earlier run; they will not be merged"
            );
        }
        // Spec selection comes first so a bad runner setup fails before any
        // network traffic.
        let dispatcher =
            Dispatcher::new(&self.config.runner, &excluded)?.with_reserved_stems(leftovers);

        let targets = self.resolve_targets(options).await?;
        tracing::info!(targets = targets.len(), "Targets resolved");

        let outcomes = dispatcher.dispatch_all(&targets).await;
        let counts = OutcomeCounts::from_outcomes(&outcomes);

        let merged = self.merge(&merger, &outcomes).await?;

        let renderer = ReportRenderer::from_config(&self.config.report)?;
        let artifact = renderer.render_and_publish(&merged)?;

        let deliveries = if options.skip_notify {
            tracing::info!("Notifications skipped");
            Vec::new()
        } else {
            Notifier::from_config(&self.config.notify, &self.config.report)
                .notify(&merged.report, &artifact)
                .await
        };

        let summary = merged.report.stats.summary();
        tracing::info!(
            identity = %merged.report.identity,
            summary = %summary,
            report = %merged.path.display(),
            published = %artifact.public_path.display(),
            "Pipeline finished"
        );

        Ok(PipelineSummary {
            invocation_id,
            identity: merged.report.identity.clone(),
            outcomes,
            counts,
            report_path: merged.path,
            artifact,
            deliveries,
            summary,
        })
    }

    async fn merge(
        &self,
        merger: &ReportMerger,
        outcomes: &[RunOutcome],
    ) -> Result<MergedReportFile> {
        let merged = match &self.identity {
            Some(identity) => merger.merge_with_identity(identity.clone(), outcomes)?,
            None => merger.merge(outcomes).await?,
        };
        Ok(merged)
    }
}
