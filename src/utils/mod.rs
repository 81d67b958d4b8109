//! Small helpers shared by the pipeline stages

pub mod error;

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use url::Url;

/// Extract domain from URL
pub fn extract_domain(url: &str) -> Result<String> {
    let parsed = Url::parse(url).context("Invalid URL")?;

    parsed
        .host_str()
        .map(|s| s.to_string())
        .context("No host in URL")
}

/// Sanitize a single path component by replacing characters that are invalid
/// in file names (including path separators)
///
/// Branch names such as `feature/login` become `feature_login`.
pub fn sanitize_filename(filename: &str) -> String {
    let sanitized: String = filename
        .trim()
        .chars()
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' => '_',
            c if c.is_whitespace() || c.is_control() => '_',
            c => c,
        })
        .collect();
    match sanitized.as_str() {
        "" | "." | ".." => "_".to_string(),
        _ => sanitized,
    }
}

/// Hex-encoded SHA-256 of a URL, truncated to `len` characters
pub fn short_hash(input: &str, len: usize) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    let hex = format!("{:x}", hasher.finalize());
    hex[..len.min(hex.len())].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_domain() {
        let domain = extract_domain("https://www.example.com/about/");
        assert_eq!(domain.unwrap(), "www.example.com");
        assert!(extract_domain("not a url").is_err());
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("feature/login"), "feature_login");
        assert_eq!(sanitize_filename("main"), "main");
        assert_eq!(sanitize_filename("fix: a|b"), "fix__a_b");
        assert_eq!(sanitize_filename(".."), "_");
        assert_eq!(sanitize_filename(""), "_");
    }

    #[test]
    fn test_short_hash_is_stable() {
        let a = short_hash("https://example.com/", 12);
        let b = short_hash("https://example.com/", 12);
        let c = short_hash("https://example.com/other", 12);
        assert_eq!(a.len(), 12);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
