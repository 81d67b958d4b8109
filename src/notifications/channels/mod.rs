//! Notification channels
//!
//! A channel turns a [`ReportMessage`] into its own envelope (mail with
//! attachment, chat text, SMS text) and delivers it exactly once.

pub mod email;
pub mod sms;
pub mod webhook;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::{NotificationEnvelope, ReportMessage};

pub type ChannelResult<T> = Result<T, ChannelError>;

/// Why a single delivery did not go out
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Endpoint answered with a non-2xx status
    #[error("HTTP {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("invalid channel configuration: {0}")]
    InvalidConfig(String),

    /// Message could not be built or the SMTP exchange failed
    #[error("mail error: {0}")]
    Mail(String),

    #[error("cannot read attachment {path}: {source}")]
    Attachment {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Result of one delivery attempt on one channel
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryStatus {
    pub channel: String,
    pub success: bool,
    /// Provider reference on success, error text on failure
    pub message: Option<String>,
    pub attempted_at: DateTime<Utc>,
}

impl DeliveryStatus {
    fn new(channel: impl Into<String>, success: bool, message: Option<String>) -> Self {
        Self {
            channel: channel.into(),
            success,
            message,
            attempted_at: Utc::now(),
        }
    }

    pub fn success(channel: impl Into<String>) -> Self {
        Self::new(channel, true, None)
    }

    pub fn success_with_message(channel: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(channel, true, Some(message.into()))
    }

    pub fn failure(channel: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::new(channel, false, Some(reason.into()))
    }
}

impl fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let outcome = if self.success { "SUCCESS" } else { "FAILED" };
        match &self.message {
            Some(message) => write!(f, "[{outcome}] {}: {message}", self.channel),
            None => write!(f, "[{outcome}] {}", self.channel),
        }
    }
}

/// A way of telling people about a report
#[async_trait]
pub trait Channel: Send + Sync {
    /// Short name used in logs and delivery results
    fn name(&self) -> &str;

    /// Envelope this channel would send for `message`
    fn compose(&self, message: &ReportMessage) -> NotificationEnvelope;

    /// Deliver one envelope, once
    async fn send(&self, envelope: &NotificationEnvelope) -> ChannelResult<DeliveryStatus>;
}
