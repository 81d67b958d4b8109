use anyhow::{Context, Result};

use sitesweep::config::Config;
use sitesweep::sitemap::{filter_urls, SitemapResolver};

pub async fn resolve(config: Config, sitemap: Option<String>, filter: Option<String>) -> Result<()> {
    let url = sitemap
        .or_else(|| config.sitemap.url.clone())
        .context("No sitemap URL given (use --sitemap or set sitemap.url)")?;

    let resolver = SitemapResolver::new(&config.sitemap, config.site.credentials())
        .context("Failed to create sitemap resolver")?;
    let mut urls = resolver
        .resolve(&url)
        .await
        .with_context(|| format!("Failed to resolve {url}"))?;

    if let Some(needle) = filter.as_deref() {
        urls = filter_urls(urls, needle);
    }

    for url in &urls {
        println!("{url}");
    }
    tracing::info!(count = urls.len(), "Resolved URLs printed");

    Ok(())
}
