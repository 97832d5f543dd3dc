//! The mail relay: turns a payload into an email and hands it to the
//! transport, one session at a time.
//!
//! The outbound email carries the pretty-printed payload twice: as the plain
//! text body and as a `data.json` attachment with an `application/json`
//! media type.
//!
//! Every send holds an async mutex for the whole transport session, so
//! concurrent callers queue up and no two sessions interleave. A hung
//! transport therefore delays every waiting request until its timeout fires.

use std::sync::Arc;

#[cfg(feature = "metrics")]
use std::time::Instant;

use serde::Serialize;
use tokio::sync::Mutex;
use tracing::Instrument;

use crate::attachment::Attachment;
use crate::config::ServiceConfig;
use crate::email::Email;
use crate::error::MailError;
use crate::json;
use crate::mailer::{DeliveryResult, Mailer};
use crate::providers;

/// Filename of the JSON attachment.
pub const ATTACHMENT_NAME: &str = "data.json";

/// Media type of the JSON attachment.
pub const ATTACHMENT_CONTENT_TYPE: &str = "application/json";

/// Serializing front for a single transport.
pub struct Relay {
    mailer: Arc<dyn Mailer>,
    from: String,
    session: Mutex<()>,
}

impl Relay {
    /// Create a relay sending from `from` through `mailer`.
    pub fn new(mailer: Arc<dyn Mailer>, from: impl Into<String>) -> Self {
        Self {
            mailer,
            from: from.into(),
            session: Mutex::new(()),
        }
    }

    /// Create a relay with the transport selected by the configuration.
    pub fn from_config(config: &ServiceConfig) -> Result<Self, MailError> {
        Ok(Self::new(providers::from_config(config)?, config.mail_from.clone()))
    }

    /// Name of the underlying transport.
    pub fn provider_name(&self) -> &'static str {
        self.mailer.provider_name()
    }

    /// Sender address.
    pub fn sender(&self) -> &str {
        &self.from
    }

    /// Build the outbound email for a payload without sending it.
    pub fn compose<T>(&self, recipient: &str, subject: &str, payload: &T) -> Result<Email, MailError>
    where
        T: Serialize + ?Sized,
    {
        if recipient.trim().is_empty() {
            return Err(MailError::MissingField("to"));
        }

        let pretty = json::to_pretty(payload)?;
        let attachment = Attachment::from_bytes(ATTACHMENT_NAME, pretty.clone().into_bytes())
            .content_type(ATTACHMENT_CONTENT_TYPE);

        Ok(Email::new()
            .from(self.from.as_str())
            .to(recipient)
            .subject(subject)
            .text_body(pretty)
            .attachment(attachment))
    }

    /// Send `payload` to `recipient`. Waits for any session in progress.
    pub async fn send<T>(
        &self,
        recipient: &str,
        subject: &str,
        payload: &T,
    ) -> Result<DeliveryResult, MailError>
    where
        T: Serialize + ?Sized,
    {
        let email = self.compose(recipient, subject, payload)?;
        let provider = self.mailer.provider_name();

        let span = tracing::info_span!(
            "json_relay.send",
            provider = provider,
            to = %recipient,
            subject = %subject,
        );

        async {
            let _session = self.session.lock().await;
            tracing::debug!("Transport session started");

            #[cfg(feature = "metrics")]
            let start = Instant::now();

            let result = self.mailer.deliver(&email).await;

            #[cfg(feature = "metrics")]
            {
                let duration = start.elapsed().as_secs_f64();
                let status = if result.is_ok() { "success" } else { "error" };
                metrics::counter!("json_relay_emails_total", "provider" => provider, "status" => status)
                    .increment(1);
                metrics::histogram!("json_relay_delivery_duration_seconds", "provider" => provider)
                    .record(duration);
            }

            match &result {
                Ok(r) => tracing::info!(message_id = %r.message_id, "Email delivered"),
                Err(e) => tracing::error!(error = %e, "Email delivery failed"),
            }

            result
        }
        .instrument(span)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::LocalMailer;
    use serde_json::json;

    fn relay() -> (Relay, Arc<LocalMailer>) {
        let mailer = Arc::new(LocalMailer::new());
        (Relay::new(mailer.clone(), "relay@example.com"), mailer)
    }

    #[test]
    fn test_compose() {
        let (relay, _) = relay();
        let payload = json!({"to": "x@y.com", "records": [{"a": 1}]});
        let email = relay.compose("ops@example.com", "Report", &payload).unwrap();

        assert_eq!(email.from.as_deref(), Some("relay@example.com"));
        assert_eq!(email.to, vec!["ops@example.com"]);
        assert_eq!(email.subject, "Report");

        let body = email.text_body.as_deref().unwrap();
        let attachment = email.find_attachment(ATTACHMENT_NAME).unwrap();
        assert_eq!(attachment.content_type, "application/json");
        assert_eq!(attachment.as_text(), Some(body));

        let reparsed: serde_json::Value = serde_json::from_str(body).unwrap();
        assert_eq!(reparsed, payload);
    }

    #[test]
    fn test_compose_rejects_blank_recipient() {
        let (relay, _) = relay();
        let err = relay.compose("  ", "Report", &json!({})).unwrap_err();
        assert!(matches!(err, MailError::MissingField("to")));
    }

    #[tokio::test]
    async fn test_send() {
        let (relay, mailer) = relay();
        relay
            .send("ops@example.com", "Report", &json!({"a": 1}))
            .await
            .unwrap();

        assert!(mailer.sent_to("ops@example.com"));
        assert_eq!(relay.provider_name(), "local");
        assert_eq!(relay.sender(), "relay@example.com");
    }

    #[tokio::test]
    async fn test_send_failure_surfaces() {
        let (relay, mailer) = relay();
        mailer.set_failure("connection refused");

        let err = relay
            .send("ops@example.com", "Report", &json!({"a": 1}))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("connection refused"));
    }
}
