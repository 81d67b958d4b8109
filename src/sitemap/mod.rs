//! Sitemap discovery
//!
//! Fetches a sitemap URL and expands it into the flat, ordered list of page
//! URLs that the test runs are dispatched against. Sitemap indexes are
//! expanded depth-first in document order; duplicates are kept.
//!
//! Expansion is bounded: a sitemap that appears again on its own expansion
//! path fails with [`SitemapError::CycleDetected`], and nesting deeper than
//! the configured limit fails with [`SitemapError::DepthExceeded`].

pub mod parser;

use futures::future::{BoxFuture, FutureExt};
use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use reqwest::Client;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use crate::config::SitemapConfig;
use crate::models::Credentials;
use crate::utils::error::{FetchError, SitemapError};

pub use parser::{parse_sitemap, SitemapNode};

/// Resolves sitemaps into page URLs
pub struct SitemapResolver {
    /// HTTP client with configured timeout and compression
    client: Client,

    /// Rate limiter to pace sitemap requests
    rate_limiter: Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>,

    /// Maximum nesting of sitemap indexes below the root
    max_depth: usize,

    /// Basic auth applied to every request
    credentials: Option<Credentials>,
}

impl SitemapResolver {
    /// Create a resolver from configuration
    ///
    /// # Errors
    ///
    /// Returns `FetchError::Http` if the HTTP client cannot be created
    pub fn new(
        config: &SitemapConfig,
        credentials: Option<Credentials>,
    ) -> Result<Self, FetchError> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .gzip(true)
            .build()?;

        let rate = NonZeroU32::new(config.requests_per_second).unwrap_or(NonZeroU32::MIN);
        let rate_limiter = Arc::new(RateLimiter::direct(Quota::per_second(rate)));

        Ok(Self {
            client,
            rate_limiter,
            max_depth: config.max_depth,
            credentials,
        })
    }

    /// Maximum index nesting this resolver accepts
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Resolve a sitemap (or sitemap index) into page URLs
    ///
    /// # Errors
    ///
    /// Fails as a whole: no partial URL list is returned when any nested
    /// sitemap cannot be fetched or parsed.
    pub async fn resolve(&self, url: &str) -> Result<Vec<String>, SitemapError> {
        tracing::info!(url = %url, "Resolving sitemap");
        let mut path = Vec::new();
        let urls = self.resolve_at(url.trim().to_string(), 0, &mut path).await?;
        tracing::info!(url = %url, count = urls.len(), "Sitemap resolved");
        Ok(urls)
    }

    fn resolve_at<'a>(
        &'a self,
        url: String,
        depth: usize,
        path: &'a mut Vec<String>,
    ) -> BoxFuture<'a, Result<Vec<String>, SitemapError>> {
        async move {
            if path.contains(&url) {
                return Err(SitemapError::CycleDetected { url });
            }
            if depth > self.max_depth {
                return Err(SitemapError::DepthExceeded {
                    url,
                    max_depth: self.max_depth,
                });
            }

            let body = self.fetch(&url).await?;
            match parse_sitemap(&url, &body)? {
                SitemapNode::Leaf(locs) => {
                    tracing::debug!(url = %url, depth, count = locs.len(), "Leaf sitemap");
                    Ok(locs)
                }
                SitemapNode::Index(children) => {
                    tracing::debug!(url = %url, depth, children = children.len(), "Sitemap index");
                    path.push(url);
                    let mut all = Vec::new();
                    for child in children {
                        let urls = self.resolve_at(child, depth + 1, path).await?;
                        all.extend(urls);
                    }
                    path.pop();
                    Ok(all)
                }
            }
        }
        .boxed()
    }

    /// Fetch a sitemap body
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        reqwest::Url::parse(url).map_err(|_| FetchError::InvalidUrl(url.to_string()))?;

        self.rate_limiter.until_ready().await;

        let mut request = self.client.get(url);
        if let Some(creds) = &self.credentials {
            request = request.basic_auth(&creds.username, Some(&creds.password));
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout
            } else {
                FetchError::Http(e)
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        Ok(response.text().await?)
    }
}

/// Parse a comma separated list of URLs, trimming entries and dropping
/// empty ones
pub fn parse_url_list(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Keep only URLs containing `needle` (case-insensitive), preserving order
pub fn filter_urls(urls: Vec<String>, needle: &str) -> Vec<String> {
    let needle = needle.to_lowercase();
    urls.into_iter()
        .filter(|url| url.to_lowercase().contains(&needle))
        .collect()
}
