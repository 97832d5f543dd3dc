//! Mailer trait and delivery result types.
//!
//! The relay holds its transport as `Arc<dyn Mailer>` so the binary can pick
//! SMTP or the logging dry run at startup and tests can swap in
//! [`LocalMailer`](crate::providers::LocalMailer). Dynamic dispatch over an
//! async method needs `#[async_trait]`; the boxed future per call is noise
//! next to a network round trip.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::email::Email;
use crate::error::MailError;

/// Result of a successful email delivery.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryResult {
    /// Message ID assigned by the transport
    pub message_id: String,
}

impl DeliveryResult {
    /// Create a new delivery result with just a message ID.
    pub fn new(message_id: impl Into<String>) -> Self {
        Self {
            message_id: message_id.into(),
        }
    }
}

/// Trait for outbound transports.
///
/// One call to [`deliver`](Mailer::deliver) is one complete transport
/// session. Implementations must not retry.
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Send a single email.
    async fn deliver(&self, email: &Email) -> Result<DeliveryResult, MailError>;

    /// Get the provider name (for logging/debugging).
    fn provider_name(&self) -> &'static str {
        "unknown"
    }
}
