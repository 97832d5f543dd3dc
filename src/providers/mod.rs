//! Transport implementations.
//!
//! Each provider implements the [`Mailer`](crate::Mailer) trait.
//!
//! | Provider | Description |
//! |----------|-------------|
//! | [`SmtpMailer`] | SMTP via lettre |
//! | [`LoggerMailer`] | Logs emails without sending (dry run) |
//! | [`LocalMailer`] | In-memory capture for tests |

use std::sync::Arc;

use crate::config::{ServiceConfig, TransportKind};
use crate::error::MailError;
use crate::mailer::Mailer;

mod local;
mod logger;
mod smtp;

pub use local::LocalMailer;
pub use logger::LoggerMailer;
pub use smtp::{SmtpBuilder, SmtpMailer, TlsMode};

/// Create the transport selected by the configuration.
pub fn from_config(config: &ServiceConfig) -> Result<Arc<dyn Mailer>, MailError> {
    match config.transport {
        TransportKind::Smtp => Ok(Arc::new(SmtpMailer::from_settings(&config.smtp)?)),
        TransportKind::Log => Ok(Arc::new(LoggerMailer::full())),
    }
}
