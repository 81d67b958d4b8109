//! Test fixtures for integration tests

use chrono::{TimeZone, Utc};
use sitesweep::models::RunIdentity;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::common::{sitemap_index, urlset};

/// Spec files of a typical project
pub const SPEC_FILES: &[&str] = &[
    "accessibility.cy.js",
    "brokenLinks.cy.js",
    "generalErrors.cy.js",
    "lighthouse.cy.js",
    "seo.cy.js",
    "visual.cy.js",
];

pub fn identity() -> RunIdentity {
    RunIdentity::new(
        "main",
        "abc1234",
        Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap(),
    )
}

/// Mount `/sitemap.xml` as an index of `/a.xml` and `/b.xml` with two pages
/// each and return the index URL
pub async fn mount_site(server: &MockServer, a: [&str; 2], b: [&str; 2]) -> String {
    let base = server.uri();
    let pages = |paths: [&str; 2]| -> Vec<String> {
        paths.iter().map(|p| format!("https://site.test/{p}")).collect()
    };

    let index = sitemap_index(&[&format!("{base}/a.xml"), &format!("{base}/b.xml")]);
    for (at, body) in [
        ("/sitemap.xml", index),
        ("/a.xml", urlset(&pages(a).iter().map(String::as_str).collect::<Vec<_>>())),
        ("/b.xml", urlset(&pages(b).iter().map(String::as_str).collect::<Vec<_>>())),
    ] {
        Mock::given(method("GET"))
            .and(path(at))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(server)
            .await;
    }

    format!("{base}/sitemap.xml")
}
