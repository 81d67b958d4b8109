//! SMS channel (Twilio-compatible REST API)
//!
//! `POST {api_base}/2010-04-01/Accounts/{sid}/Messages.json` with form fields
//! `To`, `From` and `Body`, authenticated with `sid:token`.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{Channel, ChannelError, ChannelResult, DeliveryStatus};
use crate::notifications::{NotificationEnvelope, ReportMessage};

/// SMS provider configuration
#[derive(Clone, Serialize, Deserialize)]
pub struct SmsConfig {
    pub account_sid: String,
    pub auth_token: String,
    /// Sending phone number
    pub from: String,
    /// Destination phone number
    pub to: String,
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_api_base() -> String {
    "https://api.twilio.com".to_string()
}

fn default_timeout() -> u64 {
    10
}

impl std::fmt::Debug for SmsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmsConfig")
            .field("account_sid", &self.account_sid)
            .field("auth_token", &"***")
            .field("from", &self.from)
            .field("to", &self.to)
            .field("api_base", &self.api_base)
            .finish()
    }
}

impl SmsConfig {
    pub fn new(
        account_sid: impl Into<String>,
        auth_token: impl Into<String>,
        from: impl Into<String>,
        to: impl Into<String>,
    ) -> Self {
        Self {
            account_sid: account_sid.into(),
            auth_token: auth_token.into(),
            from: from.into(),
            to: to.into(),
            api_base: default_api_base(),
            timeout_secs: default_timeout(),
        }
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    /// Messages endpoint for this account
    pub fn endpoint(&self) -> String {
        format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.api_base.trim_end_matches('/'),
            self.account_sid
        )
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.account_sid.trim().is_empty() {
            return Err("SMS account SID cannot be empty".to_string());
        }
        if self.auth_token.is_empty() {
            return Err("SMS auth token cannot be empty".to_string());
        }
        if self.from.trim().is_empty() || self.to.trim().is_empty() {
            return Err("SMS from and to numbers are required".to_string());
        }
        if !self.api_base.starts_with("http://") && !self.api_base.starts_with("https://") {
            return Err("SMS API base must start with http:// or https://".to_string());
        }
        if self.timeout_secs == 0 {
            return Err("Timeout must be greater than 0".to_string());
        }
        Ok(())
    }
}

/// SMS notification channel
pub struct SmsChannel {
    config: SmsConfig,
    client: Client,
}

impl SmsChannel {
    pub fn new(config: SmsConfig) -> ChannelResult<Self> {
        config.validate().map_err(ChannelError::InvalidConfig)?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { config, client })
    }
}

#[async_trait]
impl Channel for SmsChannel {
    fn name(&self) -> &str {
        "sms"
    }

    fn compose(&self, message: &ReportMessage) -> NotificationEnvelope {
        NotificationEnvelope {
            channel: self.name().to_string(),
            recipient: self.config.to.clone(),
            subject: message.subject(),
            body: message.sms_text(),
            attachment: None,
        }
    }

    async fn send(&self, envelope: &NotificationEnvelope) -> ChannelResult<DeliveryStatus> {
        let form = [
            ("To", envelope.recipient.as_str()),
            ("From", self.config.from.as_str()),
            ("Body", envelope.body.as_str()),
        ];

        let response = self
            .client
            .post(self.config.endpoint())
            .basic_auth(&self.config.account_sid, Some(&self.config.auth_token))
            .form(&form)
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

        tracing::info!(to = %envelope.recipient, "SMS sent");
        Ok(DeliveryStatus::success_with_message(
            self.name(),
            format!("Sent to {}", envelope.recipient),
        ))
    }
}
