//! Error types for json-relay.
//!
//! Three layers, matching how failures surface:
//!
//! - [`ConfigError`] is fatal at startup. The process exits before binding.
//! - [`MailError`] comes out of a transport and is wrapped by the relay.
//! - [`IngestError`] is per request and renders as exactly one HTTP response.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

/// Invalid or incomplete service configuration.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A required field resolved to an empty value.
    #[error("{0} must be set")]
    Missing(&'static str),

    /// A field was present but could not be parsed.
    #[error("Invalid value for {key}: {value:?} ({reason})")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },

    /// `DEFAULT_TO` is empty and the request cannot supply one.
    #[error("DEFAULT_TO must be set unless allow-to-override is enabled")]
    MissingDefaultRecipient,

    /// The override file could not be read.
    #[error("Failed to read env file {path}: {reason}")]
    EnvFile { path: String, reason: String },
}

impl ConfigError {
    pub(crate) fn invalid(key: &'static str, value: &str, reason: impl ToString) -> Self {
        Self::Invalid {
            key,
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Errors that can occur when handing a message to a transport.
#[derive(Debug, Clone, Error)]
pub enum MailError {
    /// Transport is misconfigured (bad host, TLS parameters, etc.)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Missing required field (e.g., from address).
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    /// Invalid email address format.
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    /// Error building the email message.
    #[error("Build error: {0}")]
    BuildError(String),

    /// Error sending the email.
    #[error("Send error: {0}")]
    SendError(String),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    JsonError(String),
}

impl From<serde_json::Error> for MailError {
    fn from(err: serde_json::Error) -> Self {
        Self::JsonError(err.to_string())
    }
}

impl From<lettre::error::Error> for MailError {
    fn from(err: lettre::error::Error) -> Self {
        Self::BuildError(err.to_string())
    }
}

impl From<lettre::transport::smtp::Error> for MailError {
    fn from(err: lettre::transport::smtp::Error) -> Self {
        Self::SendError(err.to_string())
    }
}

impl From<lettre::address::AddressError> for MailError {
    fn from(err: lettre::address::AddressError) -> Self {
        Self::InvalidAddress(err.to_string())
    }
}

/// Per-request failure on the HTTP surface.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Missing Content-Length header")]
    MissingContentLength,

    #[error("Invalid Content-Length header: {0:?}")]
    InvalidContentLength(String),

    #[error("Empty body: Content-Length must be positive")]
    EmptyBody,

    #[error("Body too large: Content-Length {length} exceeds limit of {limit} bytes")]
    BodyTooLarge { length: u64, limit: u64 },

    #[error("Failed to read body: {0}")]
    ReadBody(String),

    /// Body was not UTF-8 or not well-formed JSON.
    #[error("Invalid JSON: {0}")]
    InvalidJson(String),

    /// Body parsed, but to an array, scalar or null.
    #[error("Invalid JSON: JSON must be an object, got {0}")]
    NotAnObject(&'static str),

    #[error("Email send failed: {0}")]
    Relay(#[from] MailError),

    #[error("Not found")]
    NotFound { path: String },
}

impl IngestError {
    /// HTTP status for this failure.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Relay(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for IngestError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            Self::NotFound { path } => json!({ "ok": false, "error": self.to_string(), "path": path }),
            _ => json!({ "ok": false, "error": self.to_string() }),
        };
        (status, Json(body)).into_response()
    }
}
