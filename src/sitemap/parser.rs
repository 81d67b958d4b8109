//! Sitemap XML parsing
//!
//! Recognizes the two sitemap document kinds:
//!
//! ```text
//! <sitemapindex><sitemap><loc>…</loc></sitemap>…</sitemapindex>   -> Index
//! <urlset><url><loc>…</loc></url>…</urlset>                       -> Leaf
//! ```
//!
//! Elements are matched on their local name so both namespaced and
//! un-namespaced documents are accepted.

use roxmltree::{Document, Node};

use crate::utils::error::{FetchError, SitemapError};

/// A parsed sitemap document
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SitemapNode {
    /// Child sitemap URLs, in document order
    Index(Vec<String>),
    /// Page URLs, in document order
    Leaf(Vec<String>),
}

impl SitemapNode {
    pub fn is_index(&self) -> bool {
        matches!(self, Self::Index(_))
    }

    /// Number of `loc` entries
    pub fn len(&self) -> usize {
        match self {
            Self::Index(locs) | Self::Leaf(locs) => locs.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Parse a sitemap body fetched from `url`
///
/// # Errors
///
/// - `FetchError::NotXml` (wrapped) if the body is not well-formed XML
/// - `SitemapError::Format` if the root is neither `sitemapindex` nor `urlset`
pub fn parse_sitemap(url: &str, body: &str) -> Result<SitemapNode, SitemapError> {
    let doc = Document::parse(body.trim_start_matches('\u{feff}')).map_err(|e| {
        SitemapError::Fetch(FetchError::NotXml {
            url: url.to_string(),
            reason: e.to_string(),
        })
    })?;

    let root = doc.root_element();
    match root.tag_name().name() {
        "sitemapindex" => Ok(SitemapNode::Index(collect_locs(root, "sitemap"))),
        "urlset" => Ok(SitemapNode::Leaf(collect_locs(root, "url"))),
        other => Err(SitemapError::Format {
            url: url.to_string(),
            root: other.to_string(),
        }),
    }
}

/// `<entry><loc>value</loc></entry>` values in document order; entries
/// without a non-empty `loc` are skipped
fn collect_locs(root: Node<'_, '_>, entry: &str) -> Vec<String> {
    root.children()
        .filter(|n| n.is_element() && n.tag_name().name() == entry)
        .filter_map(|n| {
            n.children()
                .find(|c| c.is_element() && c.tag_name().name() == "loc")
                .and_then(|loc| loc.text())
                .map(|text| text.trim().to_string())
                .filter(|text| !text.is_empty())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const INDEX_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<sitemapindex xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
  <sitemap><loc>https://example.com/post-sitemap.xml</loc><lastmod>2024-01-01</lastmod></sitemap>
  <sitemap><loc> https://example.com/page-sitemap.xml </loc></sitemap>
</sitemapindex>"#;

    const URLSET_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
  <url><loc>https://example.com/</loc></url>
  <url><loc>https://example.com/about/</loc><priority>0.8</priority></url>
  <url><loc>https://example.com/</loc></url>
  <url><changefreq>daily</changefreq></url>
</urlset>"#;

    #[test]
    fn test_parse_index() {
        let node = parse_sitemap("https://example.com/sitemap.xml", INDEX_XML).unwrap();
        assert_eq!(
            node,
            SitemapNode::Index(vec![
                "https://example.com/post-sitemap.xml".to_string(),
                "https://example.com/page-sitemap.xml".to_string(),
            ])
        );
        assert!(node.is_index());
    }

    #[test]
    fn test_parse_urlset_keeps_order_and_duplicates() {
        let node = parse_sitemap("https://example.com/page-sitemap.xml", URLSET_XML).unwrap();
        assert_eq!(
            node,
            SitemapNode::Leaf(vec![
                "https://example.com/".to_string(),
                "https://example.com/about/".to_string(),
                "https://example.com/".to_string(),
            ])
        );
    }

    #[test]
    fn test_parse_without_namespace() {
        let xml = "<urlset><url><loc>https://a.test/x</loc></url></urlset>";
        let node = parse_sitemap("https://a.test/sitemap.xml", xml).unwrap();
        assert_eq!(node.len(), 1);
    }

    #[test]
    fn test_parse_unknown_root() {
        let xml = "<rss><channel></channel></rss>";
        let err = parse_sitemap("https://a.test/feed", xml).unwrap_err();
        match err {
            SitemapError::Format { root, .. } => assert_eq!(root, "rss"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_parse_not_xml() {
        let err = parse_sitemap("https://a.test/", "<!DOCTYPE html><html><body>").unwrap_err();
        assert!(matches!(
            err,
            SitemapError::Fetch(FetchError::NotXml { .. })
        ));

        let err = parse_sitemap("https://a.test/", "plain text").unwrap_err();
        assert!(matches!(
            err,
            SitemapError::Fetch(FetchError::NotXml { .. })
        ));
    }

    #[test]
    fn test_empty_urlset() {
        let node = parse_sitemap("https://a.test/s.xml", "<urlset></urlset>").unwrap();
        assert!(node.is_empty());
        assert!(!node.is_index());
    }
}
