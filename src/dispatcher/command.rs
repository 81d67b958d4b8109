//! Runner command construction
//!
//! The runner invocation is an argument template. Each argument may contain
//! the placeholders below; they are substituted per target:
//!
//! | placeholder           | value                                        |
//! |-----------------------|----------------------------------------------|
//! | `{url}`               | target page URL                              |
//! | `{specs}`             | comma separated spec file paths              |
//! | `{stem}`              | raw result file stem for this run            |
//! | `{page_load_timeout}` | page load timeout in milliseconds            |
//! | `{request_timeout}`   | request timeout in milliseconds              |
//!
//! Credentials never go into the argument list; they are exported to the
//! child environment as `CYPRESS_AUTH_USERNAME` / `CYPRESS_AUTH_PASSWORD`.

use std::path::PathBuf;
use tokio::process::Command;

use crate::config::RunnerConfig;
use crate::models::RunTarget;

/// Default `npx` arguments: a headless Cypress run
pub const DEFAULT_ARGS: &[&str] = &[
    "cypress",
    "run",
    "--env",
    "url={url}",
    "--config",
    "pageLoadTimeout={page_load_timeout},requestTimeout={request_timeout}",
    "--spec",
    "{specs}",
    "--reporter-options",
    "reportFilename={stem}",
];

/// Environment variable carrying the target URL
pub const ENV_TARGET_URL: &str = "SITESWEEP_TARGET_URL";
/// Environment variable carrying the raw result stem
pub const ENV_RESULT_STEM: &str = "SITESWEEP_RESULT_STEM";
const ENV_AUTH_USERNAME: &str = "CYPRESS_AUTH_USERNAME";
const ENV_AUTH_PASSWORD: &str = "CYPRESS_AUTH_PASSWORD";

/// Template for launching one runner process
#[derive(Debug, Clone)]
pub struct RunnerCommand {
    program: String,
    args: Vec<String>,
    working_dir: Option<PathBuf>,
    page_load_timeout_ms: u64,
    request_timeout_ms: u64,
}

impl RunnerCommand {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            working_dir: None,
            page_load_timeout_ms: 120_000,
            request_timeout_ms: 120_000,
        }
    }

    pub fn from_config(config: &RunnerConfig) -> Self {
        Self {
            program: config.program.clone(),
            args: config.args.clone(),
            working_dir: config.working_dir.clone(),
            page_load_timeout_ms: config.page_load_timeout_ms,
            request_timeout_ms: config.request_timeout_ms,
        }
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Substitute placeholders for one run
    pub fn render_args(&self, target: &RunTarget, specs: &[PathBuf], stem: &str) -> Vec<String> {
        let specs = specs
            .iter()
            .map(|p| p.to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join(",");
        let page_load = self.page_load_timeout_ms.to_string();
        let request = self.request_timeout_ms.to_string();

        self.args
            .iter()
            .map(|arg| {
                arg.replace("{url}", &target.url)
                    .replace("{specs}", &specs)
                    .replace("{stem}", stem)
                    .replace("{page_load_timeout}", &page_load)
                    .replace("{request_timeout}", &request)
            })
            .collect()
    }

    /// Build the process command for one run
    pub fn build(&self, target: &RunTarget, specs: &[PathBuf], stem: &str) -> Command {
        let mut command = Command::new(&self.program);
        command
            .args(self.render_args(target, specs, stem))
            .env(ENV_TARGET_URL, &target.url)
            .env(ENV_RESULT_STEM, stem);

        if let Some(dir) = &self.working_dir {
            command.current_dir(dir);
        }

        if let Some(creds) = &target.credentials {
            command
                .env(ENV_AUTH_USERNAME, &creds.username)
                .env(ENV_AUTH_PASSWORD, &creds.password);
        }

        command
    }
}
