//! Chat webhook channel
//!
//! Posts `{"text": "<summary>. Please check the attached file. <link>"}`,
//! the payload Slack incoming webhooks (and most compatible chat services)
//! accept.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

use super::{Channel, ChannelError, ChannelResult, DeliveryStatus};
use crate::notifications::{NotificationEnvelope, ReportMessage};

/// Webhook channel configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookConfig {
    /// Webhook URL endpoint
    pub url: String,
    /// Custom headers to include in requests
    #[serde(default)]
    pub headers: HashMap<String, String>,
    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_timeout() -> u64 {
    10
}

impl WebhookConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            headers: HashMap::new(),
            timeout_secs: default_timeout(),
        }
    }

    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.url.is_empty() {
            return Err("Webhook URL cannot be empty".to_string());
        }

        if !self.url.starts_with("http://") && !self.url.starts_with("https://") {
            return Err("Webhook URL must start with http:// or https://".to_string());
        }

        if self.timeout_secs == 0 {
            return Err("Timeout must be greater than 0".to_string());
        }

        Ok(())
    }
}

/// Chat webhook notification channel
pub struct WebhookChannel {
    config: WebhookConfig,
    client: Client,
}

impl WebhookChannel {
    pub fn new(config: WebhookConfig) -> ChannelResult<Self> {
        config.validate().map_err(ChannelError::InvalidConfig)?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { config, client })
    }

    pub fn from_url(url: impl Into<String>) -> ChannelResult<Self> {
        Self::new(WebhookConfig::new(url))
    }

    pub fn url(&self) -> &str {
        &self.config.url
    }
}

#[async_trait]
impl Channel for WebhookChannel {
    fn name(&self) -> &str {
        "webhook"
    }

    fn compose(&self, message: &ReportMessage) -> NotificationEnvelope {
        NotificationEnvelope {
            channel: self.name().to_string(),
            recipient: self.config.url.clone(),
            subject: message.subject(),
            body: message.chat_text(),
            attachment: None,
        }
    }

    async fn send(&self, envelope: &NotificationEnvelope) -> ChannelResult<DeliveryStatus> {
        let mut request = self.client.post(&envelope.recipient);
        for (key, value) in &self.config.headers {
            request = request.header(key, value);
        }

        let response = request
            .json(&serde_json::json!({ "text": envelope.body }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read response body".to_string());
            return Err(ChannelError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        tracing::info!(url = %envelope.recipient, status = %status, "Webhook delivered");
        Ok(DeliveryStatus::success_with_message(
            self.name(),
            format!("Delivered to {}", envelope.recipient),
        ))
    }
}
