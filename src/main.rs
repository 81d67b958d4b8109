use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sitesweep::config::Config;
use sitesweep::dispatcher::CheckCategory;

mod commands;

#[derive(Parser)]
#[command(
    name = "sitesweep",
    version,
    about = "Run website quality checks against every page of a sitemap and report the results",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (optional; defaults and environment apply without it)
    #[arg(short, long, global = true, default_value = "sitesweep.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log format (text, json); overrides logging.format
    #[arg(long, global = true)]
    log_format: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve, test, merge, render and notify
    Run {
        /// Sitemap or sitemap index URL
        #[arg(short, long, conflicts_with = "urls")]
        sitemap: Option<String>,

        /// Comma separated page URLs instead of a sitemap
        #[arg(short, long)]
        urls: Option<String>,

        /// Only test URLs containing this text
        #[arg(short, long)]
        filter: Option<String>,

        /// Check categories to skip (comma separated)
        #[arg(short, long, value_delimiter = ',')]
        exclude: Vec<CheckCategory>,

        /// Skip accessibility, SEO, visual and performance checks
        #[arg(short, long, default_value = "false")]
        quick: bool,

        /// Number of runner processes alive at once
        #[arg(long)]
        concurrency: Option<usize>,

        /// Do not send notifications
        #[arg(long, default_value = "false")]
        no_notify: bool,
    },

    /// Print the page URLs of a sitemap, one per line
    Resolve {
        /// Sitemap or sitemap index URL
        #[arg(short, long)]
        sitemap: Option<String>,

        /// Only print URLs containing this text
        #[arg(short, long)]
        filter: Option<String>,
    },

    /// Send notifications for the latest report of the current branch
    Notify {
        /// Rendered report to announce instead of the latest one
        #[arg(short, long)]
        report: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load(Some(&cli.config))?;
    if let Some(format) = &cli.log_format {
        config.logging.format = format.clone();
    }

    // Initialize tracing/logging
    setup_tracing(&config.logging.format, &config.logging.level, cli.verbose)?;

    tracing::info!(config = %cli.config.display(), "sitesweep starting");
    if !cli.config.exists() {
        tracing::debug!(path = %cli.config.display(), "Config file not found, using defaults");
    }
    config.warn_channel_problems();

    match cli.command {
        Commands::Run {
            sitemap,
            urls,
            filter,
            exclude,
            quick,
            concurrency,
            no_notify,
        } => {
            tracing::info!(
                sitemap = ?sitemap,
                urls = ?urls,
                filter = ?filter,
                exclude = ?exclude,
                quick = %quick,
                concurrency = ?concurrency,
                "Starting run command"
            );
            commands::run(
                config,
                commands::RunParams {
                    sitemap,
                    urls,
                    filter,
                    exclude,
                    quick,
                    concurrency,
                    no_notify,
                },
            )
            .await?;
        }

        Commands::Resolve { sitemap, filter } => {
            tracing::info!(sitemap = ?sitemap, filter = ?filter, "Starting resolve command");
            commands::resolve(config, sitemap, filter).await?;
        }

        Commands::Notify { report } => {
            tracing::info!(report = ?report, "Starting notify command");
            commands::notify(config, report).await?;
        }
    }

    tracing::info!("sitesweep completed successfully");
    Ok(())
}

fn setup_tracing(format: &str, level: &str, verbose: bool) -> Result<()> {
    let env_filter = if verbose {
        tracing_subscriber::EnvFilter::new("sitesweep=debug,info")
    } else {
        tracing_subscriber::EnvFilter::try_new(format!("sitesweep={level},warn"))?
    };

    match format {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
    }

    Ok(())
}
