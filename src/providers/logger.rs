//! Logger mailer that only logs emails.
//!
//! Selected with `--transport log` for a dry run: the relay still builds
//! the full message but nothing leaves the process.

use async_trait::async_trait;

use crate::email::Email;
use crate::error::MailError;
use crate::mailer::{DeliveryResult, Mailer};

/// Logger mailer that emits tracing events for emails.
pub struct LoggerMailer {
    /// If true, also log the text body at debug level.
    log_full: bool,
}

impl LoggerMailer {
    /// Create a logger mailer with brief output.
    pub fn new() -> Self {
        Self { log_full: false }
    }

    /// Create a logger mailer that also logs bodies.
    pub fn full() -> Self {
        Self { log_full: true }
    }
}

impl Default for LoggerMailer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Mailer for LoggerMailer {
    async fn deliver(&self, email: &Email) -> Result<DeliveryResult, MailError> {
        let message_id = uuid::Uuid::new_v4().to_string();

        tracing::info!(
            message_id = %message_id,
            from = ?email.from,
            to = ?email.to,
            subject = %email.subject,
            attachments = ?email.attachments.iter().map(|a| (&a.filename, a.size())).collect::<Vec<_>>(),
            "Email logged"
        );

        if self.log_full {
            if let Some(ref text) = email.text_body {
                tracing::debug!(body = %text, "Text body");
            }
        }

        Ok(DeliveryResult::new(message_id))
    }

    fn provider_name(&self) -> &'static str {
        "logger"
    }
}
