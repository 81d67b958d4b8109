//! Error types for sitemap discovery
//!
//! Network-level failures are kept apart from document-level failures so the
//! caller can tell "could not get the sitemap" from "got something that is not
//! a sitemap".

use thiserror::Error;

/// Errors that can occur while fetching a sitemap document
#[derive(Error, Debug)]
pub enum FetchError {
    /// HTTP request error (connection refused, DNS, TLS, ...)
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Request timeout
    #[error("Request timeout")]
    Timeout,

    /// Non-success status code
    #[error("Unexpected status {status} for {url}")]
    Status { url: String, status: u16 },

    /// Body could not be parsed as XML
    #[error("Response from {url} is not XML: {reason}")]
    NotXml { url: String, reason: String },

    /// Invalid URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

/// Errors produced while resolving a sitemap into page URLs
#[derive(Error, Debug)]
pub enum SitemapError {
    /// The document could not be retrieved
    #[error("Failed to fetch sitemap: {0}")]
    Fetch(#[from] FetchError),

    /// The document is XML but neither a `sitemapindex` nor a `urlset`
    #[error("Invalid sitemap format at {url}: root element <{root}>")]
    Format { url: String, root: String },

    /// A sitemap index refers back to a sitemap already being expanded
    #[error("Sitemap cycle detected at {url}")]
    CycleDetected { url: String },

    /// Nested sitemap indexes go deeper than the configured limit
    #[error("Sitemap nesting exceeds depth {max_depth} at {url}")]
    DepthExceeded { url: String, max_depth: usize },
}

impl SitemapError {
    /// URL of the sitemap the error refers to, when known
    pub fn url(&self) -> Option<&str> {
        match self {
            Self::Fetch(FetchError::Status { url, .. })
            | Self::Fetch(FetchError::NotXml { url, .. })
            | Self::Format { url, .. }
            | Self::CycleDetected { url }
            | Self::DepthExceeded { url, .. } => Some(url),
            Self::Fetch(FetchError::InvalidUrl(url)) => Some(url),
            Self::Fetch(_) => None,
        }
    }
}
