//! sitesweep - sitemap-driven website quality checks
//!
//! Discovers the pages of a site from its sitemap, runs an external browser
//! test suite against every page, merges the per-page results into a single
//! report, publishes it as HTML and tells people about it.
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - [`sitemap`] - Sitemap and sitemap-index resolution
//! - [`dispatcher`] - Runner processes, one per page
//! - [`report`] - Merging raw results, rendering and publishing
//! - [`notifications`] - Mail, chat webhook and SMS delivery
//! - [`pipeline`] - The stages wired together
//! - [`config`] - Configuration management and settings
//! - [`models`] - Core data structures and types
//! - [`utils`] - Common utilities and helpers
//!
//! # Example
//!
//! ```no_run
//! use sitesweep::config::Config;
//! use sitesweep::pipeline::{Pipeline, PipelineOptions};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env()?;
//!     let summary = Pipeline::new(config).run(&PipelineOptions::default()).await?;
//!     println!("{}", summary.summary);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod dispatcher;
pub mod error;
pub mod models;
pub mod notifications;
pub mod pipeline;
pub mod report;
pub mod sitemap;
pub mod utils;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::dispatcher::{CheckCategory, Dispatcher};
    pub use crate::error::{Error, ErrorCategory, Result, SitesweepErrorTrait};
    pub use crate::models::{PublishedArtifact, RunIdentity, RunOutcome, RunStatus, RunTarget};
    pub use crate::notifications::Notifier;
    pub use crate::pipeline::{Pipeline, PipelineOptions, PipelineSummary, TargetSource};
    pub use crate::report::{MergedReport, ReportMerger, ReportRenderer};
    pub use crate::sitemap::SitemapResolver;
}

// Direct re-exports for convenience
pub use error::{Error, Result};
pub use models::{RunOutcome, RunStatus, RunTarget};
