//! Notifier: fan a report summary out to every channel

use super::channels::email::EmailChannel;
use super::channels::sms::SmsChannel;
use super::channels::webhook::WebhookChannel;
use super::channels::{Channel, DeliveryStatus};
use super::ReportMessage;
use crate::config::{NotifyConfig, ReportConfig};
use crate::models::PublishedArtifact;
use crate::report::MergedReport;

/// Sends report notifications through the registered channels
#[derive(Default)]
pub struct Notifier {
    /// Channels in delivery order
    channels: Vec<Box<dyn Channel>>,

    /// Public domain for shareable links
    domain: Option<String>,

    /// URL path the public directory is served under
    url_path: String,
}

impl Notifier {
    pub fn new(domain: Option<String>, url_path: impl Into<String>) -> Self {
        Self {
            channels: Vec::new(),
            domain,
            url_path: url_path.into(),
        }
    }

    /// Build a notifier with every configured channel, in the order email,
    /// webhook, sms
    ///
    /// A channel whose configuration is rejected is skipped with an error
    /// log; the remaining channels are still registered.
    pub fn from_config(notify: &NotifyConfig, report: &ReportConfig) -> Self {
        let mut notifier = Self::new(notify.domain.clone(), report.public_url_path.clone());

        if let Some(config) = &notify.email {
            match EmailChannel::new(config.clone()) {
                Ok(channel) => notifier.add_channel(Box::new(channel)),
                Err(e) => tracing::error!(channel = "email", error = %e, "Skipping channel"),
            }
        }
        if let Some(config) = &notify.webhook {
            match WebhookChannel::new(config.clone()) {
                Ok(channel) => notifier.add_channel(Box::new(channel)),
                Err(e) => tracing::error!(channel = "webhook", error = %e, "Skipping channel"),
            }
        }
        if let Some(config) = &notify.sms {
            match SmsChannel::new(config.clone()) {
                Ok(channel) => notifier.add_channel(Box::new(channel)),
                Err(e) => tracing::error!(channel = "sms", error = %e, "Skipping channel"),
            }
        }

        notifier
    }

    pub fn add_channel(&mut self, channel: Box<dyn Channel>) {
        self.channels.push(channel);
    }

    pub fn channel_names(&self) -> Vec<&str> {
        self.channels.iter().map(|c| c.name()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// Message every channel will be composed from
    pub fn message(&self, report: &MergedReport, artifact: &PublishedArtifact) -> ReportMessage {
        ReportMessage::new(report, artifact, self.domain.as_deref(), &self.url_path)
    }

    /// Notify every channel once, sequentially
    ///
    /// Never fails: each channel's result, success or failure, is returned
    /// in channel order.
    pub async fn notify(
        &self,
        report: &MergedReport,
        artifact: &PublishedArtifact,
    ) -> Vec<DeliveryStatus> {
        if self.channels.is_empty() {
            tracing::info!("No notification channels configured");
            return Vec::new();
        }

        let message = self.message(report, artifact);
        tracing::info!(
            summary = %message.summary(),
            link = %message.link,
            channels = self.channels.len(),
            "Sending notifications"
        );

        let mut deliveries = Vec::with_capacity(self.channels.len());
        for channel in &self.channels {
            let envelope = channel.compose(&message);
            let status = match channel.send(&envelope).await {
                Ok(status) => status,
                Err(e) => {
                    tracing::error!(channel = channel.name(), error = %e, "Notification failed");
                    DeliveryStatus::failure(channel.name(), e.to_string())
                }
            };
            deliveries.push(status);
        }

        let delivered = deliveries.iter().filter(|d| d.success).count();
        tracing::info!(
            delivered,
            failed = deliveries.len() - delivered,
            "Notifications finished"
        );
        deliveries
    }
}
