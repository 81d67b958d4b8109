//! Configuration management for sitesweep
//!
//! Configuration is layered: built-in defaults, then an optional TOML file,
//! then environment variables. The defaults describe the conventional
//! Cypress project layout (`cypress/e2e`, `cypress/reports/...`).

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::dispatcher::specs::CheckCategory;
use crate::models::Credentials;
use crate::notifications::channels::email::EmailConfig;
use crate::notifications::channels::sms::SmsConfig;
use crate::notifications::channels::webhook::WebhookConfig;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Sitemap discovery
    pub sitemap: SitemapConfig,

    /// Credentials for protected sites
    pub site: SiteConfig,

    /// External test runner
    pub runner: RunnerConfig,

    /// Merged report and rendered artifact locations
    pub report: ReportConfig,

    /// Notification channels
    pub notify: NotifyConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Sitemap fetching configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SitemapConfig {
    /// Root sitemap (or sitemap index) URL
    pub url: Option<String>,

    /// Maximum nesting of sitemap indexes
    pub max_depth: usize,

    /// Rate limit (requests per second)
    pub requests_per_second: u32,

    /// Request timeout in seconds
    pub request_timeout_secs: u64,

    /// User agent string
    pub user_agent: String,
}

impl Default for SitemapConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_depth: 8,
            requests_per_second: 5,
            request_timeout_secs: 30,
            user_agent: format!("sitesweep/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Protected-site configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    pub username: Option<String>,
    pub password: Option<String>,
}

impl SiteConfig {
    /// Credentials are only used when both halves are present
    pub fn credentials(&self) -> Option<Credentials> {
        match (&self.username, &self.password) {
            (Some(user), Some(pass)) => Some(Credentials::new(user, pass)),
            _ => None,
        }
    }
}

/// Test runner configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Executable to launch
    pub program: String,

    /// Argument template; see [`crate::dispatcher::command::RunnerCommand`]
    pub args: Vec<String>,

    /// Working directory for the runner (defaults to the current directory)
    pub working_dir: Option<PathBuf>,

    /// Directory holding the test-spec files
    pub spec_dir: PathBuf,

    /// Check categories never passed to the runner
    pub exclude: Vec<CheckCategory>,

    /// Page load timeout handed to the runner (ms)
    pub page_load_timeout_ms: u64,

    /// Request timeout handed to the runner (ms)
    pub request_timeout_ms: u64,

    /// Prefix of raw result file names
    pub result_prefix: String,

    /// Number of runner processes alive at once
    pub concurrency: usize,

    /// Optional wall-clock limit per run (seconds)
    pub run_timeout_secs: Option<u64>,

    /// Lines of runner output kept per outcome
    pub output_tail_lines: usize,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            program: "npx".to_string(),
            args: crate::dispatcher::command::DEFAULT_ARGS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            working_dir: None,
            spec_dir: PathBuf::from("cypress/e2e"),
            exclude: Vec::new(),
            page_load_timeout_ms: 120_000,
            request_timeout_ms: 120_000,
            result_prefix: "mochawesome".to_string(),
            concurrency: 1,
            run_timeout_secs: None,
            output_tail_lines: 40,
        }
    }
}

impl RunnerConfig {
    /// Get the optional per-run limit as Duration
    #[must_use]
    pub fn run_timeout(&self) -> Option<Duration> {
        self.run_timeout_secs.map(Duration::from_secs)
    }
}

/// Report locations
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Where the runner writes raw per-run result files
    pub raw_dir: PathBuf,

    /// Root of merged reports; one sub-directory per branch
    pub output_dir: PathBuf,

    /// Externally servable upload directory
    pub public_dir: PathBuf,

    /// URL path under which `public_dir` is served
    pub public_url_path: String,

    /// Repository used to derive branch and commit
    pub repo_dir: PathBuf,

    /// Custom Handlebars template for the rendered report
    pub template: Option<PathBuf>,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            raw_dir: PathBuf::from("cypress/reports/mochawesome"),
            output_dir: PathBuf::from("cypress/reports"),
            public_dir: PathBuf::from("../wp-content/uploads/cypress-reports"),
            public_url_path: "wp-content/uploads/cypress-reports".to_string(),
            repo_dir: PathBuf::from(".."),
            template: None,
        }
    }
}

/// Notification configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NotifyConfig {
    /// Public domain used to build shareable report links
    pub domain: Option<String>,

    pub email: Option<EmailConfig>,

    pub webhook: Option<WebhookConfig>,

    pub sms: Option<SmsConfig>,
}

impl NotifyConfig {
    /// Whether any channel is configured
    pub fn has_channels(&self) -> bool {
        self.email.is_some() || self.webhook.is_some() || self.sms.is_some()
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (text, json)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: String::from("info"),
            format: String::from("text"),
        }
    }
}

fn env_var(keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| std::env::var(key).ok())
        .find(|value| !value.trim().is_empty())
}

impl Config {
    /// Load configuration: file (if present) + environment, then validate
    ///
    /// Runs before logging is set up, so nothing is logged here; broken
    /// notification channels are left for [`Config::warn_channel_problems`].
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) if path.exists() => Self::from_file(path)?,
            _ => Self::default(),
        };

        config.apply_env();
        config.validate().context("Invalid configuration")?;
        Ok(config)
    }

    /// Load configuration from environment variables on top of defaults
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env();
        Ok(config)
    }

    /// Load configuration from a file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML config file: {}", path.display()))?;

        Ok(config)
    }

    /// Override values from environment variables
    ///
    /// Besides the `SITESWEEP_*` names, the variable names used by existing
    /// deployments (`SITEMAP_URL`, `SLACK_WEBHOOK`, `GMAIL_USER`, `TWILIO_SID`,
    /// ...) are honoured.
    pub fn apply_env(&mut self) {
        if let Some(url) = env_var(&["SITESWEEP_SITEMAP_URL", "SITEMAP_URL"]) {
            self.sitemap.url = Some(url);
        }

        if let Some(depth) =
            env_var(&["SITESWEEP_MAX_DEPTH"]).and_then(|v| v.parse::<usize>().ok())
        {
            self.sitemap.max_depth = depth;
        }

        if let Some(user) = env_var(&["SITESWEEP_AUTH_USERNAME"]) {
            self.site.username = Some(user);
        }
        if let Some(pass) = env_var(&["SITESWEEP_AUTH_PASSWORD"]) {
            self.site.password = Some(pass);
        }

        if let Some(concurrency) =
            env_var(&["SITESWEEP_CONCURRENCY"]).and_then(|v| v.parse::<usize>().ok())
        {
            self.runner.concurrency = concurrency;
        }

        if let Some(program) = env_var(&["SITESWEEP_RUNNER"]) {
            self.runner.program = program;
        }

        if let Some(domain) = env_var(&["SITESWEEP_DOMAIN", "DOMAIN"]) {
            self.notify.domain = Some(domain);
        }

        if let Some(url) = env_var(&["SITESWEEP_WEBHOOK_URL", "SLACK_WEBHOOK"]) {
            match self.notify.webhook.as_mut() {
                Some(webhook) => webhook.url = url,
                None => self.notify.webhook = Some(WebhookConfig::new(url)),
            }
        }

        if let (Some(user), Some(pass)) = (
            env_var(&["SITESWEEP_SMTP_USER", "GMAIL_USER"]),
            env_var(&["SITESWEEP_SMTP_PASSWORD", "GMAIL_PASS"]),
        ) {
            match self.notify.email.as_mut() {
                Some(email) => {
                    email.username = user;
                    email.password = pass;
                }
                None => self.notify.email = Some(EmailConfig::new(user, pass)),
            }
        }

        if let (Some(sid), Some(token), Some(from), Some(to)) = (
            env_var(&["SITESWEEP_TWILIO_SID", "TWILIO_SID"]),
            env_var(&["SITESWEEP_TWILIO_AUTH", "TWILIO_AUTH"]),
            env_var(&["SITESWEEP_TWILIO_PHONE", "TWILIO_PHONE"]),
            env_var(&["SITESWEEP_TO_PHONE", "TO_PHONE"]),
        ) {
            self.notify.sms = Some(SmsConfig::new(sid, token, from, to));
        }

        if let Some(level) = env_var(&["SITESWEEP_LOG_LEVEL"]) {
            self.logging.level = level;
        }
        if let Some(format) = env_var(&["SITESWEEP_LOG_FORMAT"]) {
            self.logging.format = format;
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.sitemap.max_depth == 0 {
            anyhow::bail!("sitemap.max_depth must be greater than 0");
        }

        if self.sitemap.requests_per_second == 0 {
            anyhow::bail!("sitemap.requests_per_second must be greater than 0");
        }

        if self.sitemap.request_timeout_secs == 0 {
            anyhow::bail!("sitemap.request_timeout_secs must be greater than 0");
        }

        if self.runner.program.trim().is_empty() {
            anyhow::bail!("runner.program cannot be empty");
        }

        if self.runner.concurrency == 0 {
            anyhow::bail!("runner.concurrency must be greater than 0");
        }

        if self.runner.result_prefix.trim().is_empty() {
            anyhow::bail!("runner.result_prefix cannot be empty");
        }

        if self.site.username.is_some() != self.site.password.is_some() {
            anyhow::bail!("site.username and site.password must be set together");
        }

        Ok(())
    }

    /// Log every broken notification channel; returns how many there are
    ///
    /// A broken channel only disables that channel.
    pub fn warn_channel_problems(&self) -> usize {
        let problems = self.channel_problems();
        for problem in &problems {
            tracing::warn!(problem = %problem, "Notification channel will be skipped");
        }
        problems.len()
    }

    /// Validation problems of configured notification channels
    pub fn channel_problems(&self) -> Vec<String> {
        let mut problems = Vec::new();
        if let Some(Err(e)) = self.notify.email.as_ref().map(|c| c.validate()) {
            problems.push(format!("notify.email: {e}"));
        }
        if let Some(Err(e)) = self.notify.webhook.as_ref().map(|c| c.validate()) {
            problems.push(format!("notify.webhook: {e}"));
        }
        if let Some(Err(e)) = self.notify.sms.as_ref().map(|c| c.validate()) {
            problems.push(format!("notify.sms: {e}"));
        }
        problems
    }

    /// Get sitemap request timeout as Duration
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.sitemap.request_timeout_secs)
    }
}
