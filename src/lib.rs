//! # json-relay
//!
//! Receive JSON documents over HTTP and relay them by email.
//!
//! A producer POSTs a JSON object to `/ingest`. The service checks the body,
//! picks the recipient and subject, and sends the pretty-printed document as
//! both the email body and a `data.json` attachment.
//!
//! ## Quick Start
//!
//! ```bash
//! SMTP_HOST=smtp.example.com
//! SMTP_USER=relay@example.com
//! SMTP_PASS=secret
//! SMTP_FROM=relay@example.com
//! DEFAULT_TO=ops@example.com
//! json-relay --port 8080
//! ```
//!
//! ```bash
//! curl -X POST http://127.0.0.1:8080/ingest \
//!     -H 'Content-Type: application/json' \
//!     -d '{"subject": "Weekly report", "records": [{"a": 1}]}'
//! ```
//!
//! ## Embedding
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use json_relay::{ingest, providers::LocalMailer, Relay};
//!
//! let relay = Arc::new(Relay::new(Arc::new(LocalMailer::new()), "relay@example.com"));
//! let app = ingest::router(Arc::new(config), relay);
//! ```
//!
//! See [`config`] for every setting and its environment variable.
//!
//! ## Metrics
//!
//! Enable `features = ["metrics"]` to emit `json_relay_emails_total`
//! (counter, by provider and status) and
//! `json_relay_delivery_duration_seconds` (histogram, by provider).

/// Service name reported by `/health`.
pub const SERVICE_NAME: &str = "json-relay";

mod attachment;
mod email;
mod error;
mod mailer;
mod storage;

pub mod config;
pub mod env_file;
pub mod ingest;
pub mod json;
pub mod providers;
pub mod relay;
pub mod routing;
pub mod server;
pub mod telemetry;

// Re-exports
pub use attachment::Attachment;
pub use config::{Cli, Environment, ServiceConfig};
pub use email::Email;
pub use error::{ConfigError, IngestError, MailError};
pub use mailer::{DeliveryResult, Mailer};
pub use relay::Relay;
pub use routing::RoutingDecision;
pub use storage::{MemoryStorage, StoredEmail};
