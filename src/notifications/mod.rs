//! Report notifications
//!
//! Broadcasts the pass/total summary of a merged report, with a link to the
//! published HTML, through every configured channel.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────┐
//! │      Notifier                              │
//! │  - Summary extraction                      │
//! │  - Per-channel envelope composition        │
//! │  - Failure isolation                       │
//! └────────────────────────────────────────────┘
//!                     │
//!         ┌───────────┼───────────┐
//!         ▼           ▼           ▼
//!   ┌─────────┐ ┌─────────┐ ┌─────────┐
//!   │  Email  │ │ Webhook │ │   SMS   │
//!   │ Channel │ │ Channel │ │ Channel │
//!   └─────────┘ └─────────┘ └─────────┘
//! ```
//!
//! Each channel is attempted exactly once. A failing channel is logged and
//! reported in its [`DeliveryStatus`]; it never stops the others.

pub mod channels;
mod manager;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::models::PublishedArtifact;
use crate::report::MergedReport;

pub use channels::email::EmailChannel;
pub use channels::sms::SmsChannel;
pub use channels::webhook::WebhookChannel;
pub use channels::{Channel, ChannelError, DeliveryStatus};
pub use manager::Notifier;

/// One message addressed to one channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationEnvelope {
    pub channel: String,
    /// Mail address, webhook URL or phone number
    pub recipient: String,
    pub subject: String,
    pub body: String,
    pub attachment: Option<PathBuf>,
}

/// What every channel is told about a report
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportMessage {
    pub passes: u64,
    pub tests: u64,
    /// Shareable link to the published report
    pub link: String,
    /// Rendered report to attach where the channel supports it
    pub attachment: PathBuf,
}

impl ReportMessage {
    /// Build the message from a merged report and its published artifact
    ///
    /// Without a public `domain` the link falls back to the published path.
    pub fn new(
        report: &MergedReport,
        artifact: &PublishedArtifact,
        domain: Option<&str>,
        url_path: &str,
    ) -> Self {
        let link = match domain {
            Some(domain) if !domain.trim().is_empty() => artifact.public_url(domain, url_path),
            _ => artifact.public_path.display().to_string(),
        };
        Self {
            passes: report.stats.passes,
            tests: report.stats.tests,
            link,
            attachment: artifact.local_path.clone(),
        }
    }

    /// `"<passes>/<tests> passed"`
    pub fn summary(&self) -> String {
        format!("{}/{} passed", self.passes, self.tests)
    }

    pub fn subject(&self) -> String {
        format!("Site quality report: {}", self.summary())
    }

    /// Chat text
    pub fn chat_text(&self) -> String {
        format!("{}. Please check the attached file. {}", self.summary(), self.link)
    }

    /// Short text for SMS
    pub fn sms_text(&self) -> String {
        format!(
            "{}/{} tests passed. Report: {}",
            self.passes, self.tests, self.link
        )
    }

    /// HTML mail body
    pub fn mail_html(&self) -> String {
        format!(
            "<p>Please find the attached site quality report.</p>\
             <p><strong>{}</strong></p>\
             <p><a href=\"{link}\">{link}</a></p>",
            self.summary(),
            link = self.link
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RunIdentity;
    use crate::report::ReportStats;
    use chrono::Utc;

    fn message(domain: Option<&str>) -> ReportMessage {
        let report = MergedReport {
            identity: RunIdentity::new("main", "abc1234", Utc::now()),
            stats: ReportStats {
                tests: 4,
                passes: 2,
                ..Default::default()
            },
            results: Vec::new(),
            runs: Vec::new(),
            meta: None,
        };
        let artifact = PublishedArtifact {
            report_name: "r".to_string(),
            local_path: PathBuf::from("cypress/reports/main/r.html"),
            public_path: PathBuf::from("/srv/uploads/r.html"),
        };
        ReportMessage::new(&report, &artifact, domain, "wp-content/uploads/cypress-reports")
    }

    #[test]
    fn test_message_texts() {
        let msg = message(Some("example.com"));
        assert_eq!(msg.summary(), "2/4 passed");
        assert_eq!(msg.subject(), "Site quality report: 2/4 passed");
        assert_eq!(
            msg.chat_text(),
            "2/4 passed. Please check the attached file. \
             https://example.com/wp-content/uploads/cypress-reports/r.html"
        );
        assert_eq!(
            msg.sms_text(),
            "2/4 tests passed. Report: https://example.com/wp-content/uploads/cypress-reports/r.html"
        );
        assert!(msg.mail_html().contains("2/4 passed"));
        assert_eq!(msg.attachment, PathBuf::from("cypress/reports/main/r.html"));
    }

    #[test]
    fn test_link_without_domain() {
        assert_eq!(message(None).link, "/srv/uploads/r.html");
        assert_eq!(message(Some("  ")).link, "/srv/uploads/r.html");
    }
}
