//! Unified error handling for the sitesweep crate
//!
//! Every stage has its own error type; this module folds them into a single
//! [`Error`] for callers that cross stage boundaries (the pipeline and the
//! commands).
//!
//! # Architecture
//!
//! - [`SitesweepErrorTrait`] - Common interface implemented by all error types
//! - [`ErrorCategory`] - coarse class used in logs and exit reporting
//! - [`Error`] - what a pipeline stage returns
//!
//! # Usage
//!
//! ```rust,ignore
//! use sitesweep::error::{Error, SitesweepErrorTrait};
//!
//! fn report(err: &Error) {
//!     eprintln!("[{}] {err}", err.category());
//! }
//! ```

use std::fmt;
use thiserror::Error;

pub use crate::dispatcher::DispatchError;
pub use crate::report::{MergeError, PublishError, RenderError};
pub use crate::utils::error::{FetchError, SitemapError};

/// Common trait for all sitesweep error types
pub trait SitesweepErrorTrait: std::error::Error {
    /// Check if this error is recoverable (a later attempt may succeed)
    fn is_recoverable(&self) -> bool;

    /// Coarse class of the failure
    fn category(&self) -> ErrorCategory;
}

/// Coarse error classes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Network-related errors (HTTP, timeout, status)
    Network,
    /// Malformed sitemaps or result files
    Parsing,
    /// Filesystem errors
    Storage,
    /// Runner process problems
    Process,
    /// Bad configuration or impossible options
    Config,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Network => "network",
            Self::Parsing => "parsing",
            Self::Storage => "storage",
            Self::Process => "process",
            Self::Config => "config",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl SitesweepErrorTrait for FetchError {
    fn is_recoverable(&self) -> bool {
        match self {
            Self::Http(_) | Self::Timeout => true,
            Self::Status { status, .. } => *status >= 500 || *status == 429,
            Self::NotXml { .. } | Self::InvalidUrl(_) => false,
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::NotXml { .. } => ErrorCategory::Parsing,
            Self::InvalidUrl(_) => ErrorCategory::Config,
            _ => ErrorCategory::Network,
        }
    }
}

impl SitesweepErrorTrait for SitemapError {
    fn is_recoverable(&self) -> bool {
        match self {
            Self::Fetch(e) => e.is_recoverable(),
            _ => false,
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::Fetch(e) => e.category(),
            _ => ErrorCategory::Parsing,
        }
    }
}

impl SitesweepErrorTrait for MergeError {
    fn is_recoverable(&self) -> bool {
        matches!(self, Self::ReportExists { .. })
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::Identity { .. } => ErrorCategory::Process,
            Self::InvalidRawFile { .. } | Self::Serialize(_) => ErrorCategory::Parsing,
            Self::NoRawResults { .. } | Self::ReportExists { .. } | Self::Io { .. } => {
                ErrorCategory::Storage
            }
        }
    }
}

/// Unified error type for the sitesweep crate
#[derive(Error, Debug)]
pub enum Error {
    /// Sitemap resolution errors
    #[error("Sitemap error: {0}")]
    Sitemap(#[from] SitemapError),

    /// Fetch-specific errors
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// Dispatch preparation errors
    #[error("Dispatch error: {0}")]
    Dispatch(#[from] DispatchError),

    /// Report merge errors
    #[error("Merge error: {0}")]
    Merge(#[from] MergeError),

    /// HTML rendering errors
    #[error("Render error: {0}")]
    Render(#[from] RenderError),

    /// Report publishing errors
    #[error("Publish error: {0}")]
    Publish(#[from] PublishError),

    /// Configuration errors
    #[error("Config error: {0}")]
    Config(String),
}

impl SitesweepErrorTrait for Error {
    fn is_recoverable(&self) -> bool {
        match self {
            Self::Sitemap(e) => e.is_recoverable(),
            Self::Fetch(e) => e.is_recoverable(),
            Self::Merge(e) => e.is_recoverable(),
            Self::Dispatch(_) | Self::Render(_) | Self::Config(_) => false,
            Self::Publish(_) => true,
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::Sitemap(e) => e.category(),
            Self::Fetch(e) => e.category(),
            Self::Merge(e) => e.category(),
            Self::Dispatch(DispatchError::SpecDir { .. }) => ErrorCategory::Storage,
            Self::Dispatch(DispatchError::NoSpecFiles { .. }) => ErrorCategory::Config,
            Self::Render(RenderError::Template(_)) => ErrorCategory::Config,
            Self::Render(RenderError::Io { .. }) | Self::Publish(_) => ErrorCategory::Storage,
            Self::Config(_) => ErrorCategory::Config,
        }
    }
}

impl Error {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
