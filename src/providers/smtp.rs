//! SMTP provider using lettre.
//!
//! Each delivery opens its own connection: greeting, optional STARTTLS
//! upgrade and second greeting, optional AUTH, the message, then QUIT.
//! Connections are not pooled.
//!
//! # Example
//!
//! ```rust,ignore
//! use json_relay::providers::SmtpMailer;
//!
//! let mailer = SmtpMailer::new("smtp.example.com", 587)
//!     .credentials("username", "password")
//!     .build()?;
//! ```

use std::time::Duration;

use async_trait::async_trait;
use lettre::{
    message::{
        header::ContentType, Attachment as LettreAttachment, Mailbox, MultiPart, SinglePart,
    },
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};

use crate::config::{SmtpSettings, DEFAULT_SMTP_TIMEOUT_SECS};
use crate::email::Email;
use crate::error::MailError;
use crate::mailer::{DeliveryResult, Mailer};

/// SMTP email provider.
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpMailer {
    /// Create a new SMTP mailer builder with STARTTLS required.
    pub fn new(host: &str, port: u16) -> SmtpBuilder {
        SmtpBuilder {
            host: host.to_string(),
            port,
            credentials: None,
            tls: TlsMode::StartTls,
            timeout: Duration::from_secs(DEFAULT_SMTP_TIMEOUT_SECS),
        }
    }

    /// Build a mailer from resolved service settings.
    pub fn from_settings(settings: &SmtpSettings) -> Result<Self, MailError> {
        let mut builder = Self::new(&settings.host, settings.port).timeout(settings.timeout);
        if !settings.starttls {
            builder = builder.no_tls();
        }
        if let Some((user, pass)) = settings.credentials() {
            builder = builder.credentials(user, pass);
        }
        builder.build()
    }

    /// Build a lettre Message from our Email struct.
    fn build_message(&self, email: &Email) -> Result<Message, MailError> {
        let from = email
            .from
            .as_deref()
            .ok_or(MailError::MissingField("from"))?;

        if email.to.is_empty() {
            return Err(MailError::MissingField("to"));
        }

        let mut builder = Message::builder()
            .from(parse_mailbox(from)?)
            .subject(&email.subject);

        for to in &email.to {
            builder = builder.to(parse_mailbox(to)?);
        }

        let text = email.text_body.clone().unwrap_or_default();

        let message = if email.attachments.is_empty() {
            builder.header(ContentType::TEXT_PLAIN).body(text)?
        } else {
            let mut multipart = MultiPart::mixed().singlepart(
                SinglePart::builder()
                    .header(ContentType::TEXT_PLAIN)
                    .body(text),
            );

            for attachment in &email.attachments {
                let content_type: ContentType = attachment
                    .content_type
                    .parse()
                    .unwrap_or(ContentType::TEXT_PLAIN);

                multipart = multipart.singlepart(
                    LettreAttachment::new(attachment.filename.clone())
                        .body(attachment.data.clone(), content_type),
                );
            }

            builder.multipart(multipart)?
        };

        Ok(message)
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn deliver(&self, email: &Email) -> Result<DeliveryResult, MailError> {
        let message = self.build_message(email)?;

        let response = self
            .transport
            .send(message)
            .await
            .map_err(|e| MailError::SendError(e.to_string()))?;

        // Extract message ID from SMTP response, or generate one
        let message_id = response
            .message()
            .next()
            .and_then(|m| m.lines().next())
            .map(|s| s.to_string())
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

        Ok(DeliveryResult::new(message_id))
    }

    fn provider_name(&self) -> &'static str {
        "smtp"
    }
}

/// TLS mode for SMTP connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TlsMode {
    /// No TLS (plaintext session)
    None,
    /// STARTTLS - upgrade to TLS after the greeting (port 587)
    StartTls,
}

/// Builder for SmtpMailer.
pub struct SmtpBuilder {
    host: String,
    port: u16,
    credentials: Option<Credentials>,
    tls: TlsMode,
    timeout: Duration,
}

impl SmtpBuilder {
    /// Set SMTP credentials.
    pub fn credentials(mut self, username: &str, password: &str) -> Self {
        self.credentials = Some(Credentials::new(username.to_string(), password.to_string()));
        self
    }

    /// Set TLS mode.
    pub fn tls(mut self, mode: TlsMode) -> Self {
        self.tls = mode;
        self
    }

    /// Disable TLS.
    pub fn no_tls(mut self) -> Self {
        self.tls = TlsMode::None;
        self
    }

    /// Bound every network step of a session.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Build the SmtpMailer.
    pub fn build(self) -> Result<SmtpMailer, MailError> {
        let builder = match self.tls {
            TlsMode::None => AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&self.host),
            TlsMode::StartTls => AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&self.host)
                .map_err(|e| MailError::Configuration(e.to_string()))?,
        };

        let mut builder = builder.port(self.port).timeout(Some(self.timeout));
        if let Some(creds) = self.credentials {
            builder = builder.credentials(creds);
        }

        Ok(SmtpMailer {
            transport: builder.build(),
        })
    }
}

fn parse_mailbox(addr: &str) -> Result<Mailbox, MailError> {
    addr.parse()
        .map_err(|e: lettre::address::AddressError| MailError::InvalidAddress(format!("{addr}: {e}")))
}
