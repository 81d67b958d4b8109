//! Mail channel
//!
//! Sends an HTML mail with the rendered report attached over authenticated
//! SMTP (STARTTLS/TLS relay). Without explicit recipients the mail goes to
//! the sending account itself.

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{Channel, ChannelError, ChannelResult, DeliveryStatus};
use crate::notifications::{NotificationEnvelope, ReportMessage};

/// SMTP configuration
#[derive(Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    #[serde(default = "default_smtp_host")]
    pub smtp_host: String,
    /// Relay port; the TLS default when unset
    #[serde(default)]
    pub smtp_port: Option<u16>,
    pub username: String,
    pub password: String,
    /// Sender address, `username` when unset
    #[serde(default)]
    pub from: Option<String>,
    /// Recipients, `username` when empty
    #[serde(default)]
    pub to: Vec<String>,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_smtp_host() -> String {
    "smtp.gmail.com".to_string()
}

fn default_timeout() -> u64 {
    30
}

// Keep the password out of logs.
impl std::fmt::Debug for EmailConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmailConfig")
            .field("smtp_host", &self.smtp_host)
            .field("smtp_port", &self.smtp_port)
            .field("username", &self.username)
            .field("password", &"***")
            .field("from", &self.from)
            .field("to", &self.to)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl EmailConfig {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            smtp_host: default_smtp_host(),
            smtp_port: None,
            username: username.into(),
            password: password.into(),
            from: None,
            to: Vec::new(),
            timeout_secs: default_timeout(),
        }
    }

    pub fn with_recipient(mut self, to: impl Into<String>) -> Self {
        self.to.push(to.into());
        self
    }

    pub fn sender(&self) -> &str {
        self.from.as_deref().unwrap_or(&self.username)
    }

    pub fn recipients(&self) -> Vec<String> {
        if self.to.is_empty() {
            vec![self.username.clone()]
        } else {
            self.to.clone()
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.smtp_host.trim().is_empty() {
            return Err("SMTP host cannot be empty".to_string());
        }
        if self.username.trim().is_empty() {
            return Err("SMTP username cannot be empty".to_string());
        }
        if self.password.is_empty() {
            return Err("SMTP password cannot be empty".to_string());
        }
        if self.timeout_secs == 0 {
            return Err("Timeout must be greater than 0".to_string());
        }
        for address in std::iter::once(self.sender().to_string()).chain(self.recipients()) {
            address
                .parse::<Mailbox>()
                .map_err(|e| format!("Invalid mail address '{address}': {e}"))?;
        }
        Ok(())
    }
}

/// SMTP mail channel
pub struct EmailChannel {
    config: EmailConfig,
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl EmailChannel {
    pub fn new(config: EmailConfig) -> ChannelResult<Self> {
        config.validate().map_err(ChannelError::InvalidConfig)?;

        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::relay(&config.smtp_host)
            .map_err(|e| ChannelError::InvalidConfig(e.to_string()))?
            .credentials(Credentials::new(
                config.username.clone(),
                config.password.clone(),
            ))
            .timeout(Some(Duration::from_secs(config.timeout_secs)));
        if let Some(port) = config.smtp_port {
            builder = builder.port(port);
        }

        Ok(Self {
            transport: builder.build(),
            config,
        })
    }

    async fn build_message(&self, envelope: &NotificationEnvelope) -> ChannelResult<Message> {
        let mailbox = |address: &str| {
            address
                .parse::<Mailbox>()
                .map_err(|e| ChannelError::Mail(format!("invalid address '{address}': {e}")))
        };

        let mut builder = Message::builder()
            .from(mailbox(self.config.sender())?)
            .subject(envelope.subject.clone());
        for address in envelope.recipient.split(',').map(str::trim) {
            if !address.is_empty() {
                builder = builder.to(mailbox(address)?);
            }
        }

        let mut parts = MultiPart::mixed().singlepart(SinglePart::html(envelope.body.clone()));
        if let Some(path) = &envelope.attachment {
            let content = tokio::fs::read(path)
                .await
                .map_err(|source| ChannelError::Attachment {
                    path: path.display().to_string(),
                    source,
                })?;
            let file_name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "report.html".to_string());
            parts = parts.singlepart(Attachment::new(file_name).body(content, ContentType::TEXT_HTML));
        }

        builder
            .multipart(parts)
            .map_err(|e| ChannelError::Mail(e.to_string()))
    }
}

#[async_trait]
impl Channel for EmailChannel {
    fn name(&self) -> &str {
        "email"
    }

    fn compose(&self, message: &ReportMessage) -> NotificationEnvelope {
        NotificationEnvelope {
            channel: self.name().to_string(),
            recipient: self.config.recipients().join(", "),
            subject: message.subject(),
            body: message.mail_html(),
            attachment: Some(message.attachment.clone()),
        }
    }

    async fn send(&self, envelope: &NotificationEnvelope) -> ChannelResult<DeliveryStatus> {
        let message = self.build_message(envelope).await?;
        self.transport
            .send(message)
            .await
            .map_err(|e| ChannelError::Mail(e.to_string()))?;

        tracing::info!(to = %envelope.recipient, "Report mail sent");
        Ok(DeliveryStatus::success_with_message(
            self.name(),
            format!("Sent to {}", envelope.recipient),
        ))
    }
}
