//! JSON typing and rendering shared by every emission in the service.
//!
//! Inbound documents stay as [`serde_json::Value`]; the helpers here keep the
//! shape checks (is it an object, is a field a non-blank string) in one place.
//!
//! ## Rendering rules
//!
//! - Timestamps render as extended ISO-8601. A zero UTC offset is always
//!   written as a literal `Z`, never `+00:00`. See [`Timestamp`] and
//!   [`format_datetime`].
//! - Numbers keep the exact text they arrived with: `12.50` stays `12.50`,
//!   integers wider than 64 bits and 17-digit floats are not rounded.
//! - Pretty output uses two-space indentation and leaves non-ASCII text
//!   unescaped.

use chrono::{DateTime, SecondsFormat, TimeZone, Timelike, Utc};
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

use crate::error::IngestError;

/// A JSON object as received on `/ingest`.
pub type JsonObject = Map<String, Value>;

/// Typed accessors over a dynamic JSON value.
pub trait JsonValueExt {
    /// The trimmed string if this is a string with non-whitespace content.
    fn as_nonblank_str(&self) -> Option<&str>;

    /// Short name of the JSON type, for error messages.
    fn kind(&self) -> &'static str;
}

impl JsonValueExt for Value {
    fn as_nonblank_str(&self) -> Option<&str> {
        self.as_str().map(str::trim).filter(|s| !s.is_empty())
    }

    fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
        }
    }
}

/// Look up `key` in `object` and return it as a non-blank trimmed string.
pub fn nonblank_field<'a>(object: &'a JsonObject, key: &str) -> Option<&'a str> {
    object.get(key).and_then(|v| v.as_nonblank_str())
}

/// Unwrap an object, rejecting arrays, scalars and null.
pub fn require_object(value: Value) -> Result<JsonObject, IngestError> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(IngestError::NotAnObject(other.kind())),
    }
}

/// Decode a request body: UTF-8, then JSON, then object shape.
pub fn parse_object(bytes: &[u8]) -> Result<JsonObject, IngestError> {
    let text = std::str::from_utf8(bytes).map_err(|e| IngestError::InvalidJson(e.to_string()))?;
    let value: Value =
        serde_json::from_str(text).map_err(|e| IngestError::InvalidJson(e.to_string()))?;
    require_object(value)
}

/// Pretty-print with two-space indentation.
pub fn to_pretty<T: Serialize + ?Sized>(value: &T) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(value)
}

/// Format an aware timestamp, writing `Z` for a zero offset.
pub fn format_datetime<Tz: TimeZone>(dt: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    dt.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

/// A UTC instant that serializes as ISO-8601 with a `Z` suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Timestamp(pub DateTime<Utc>);

impl Timestamp {
    /// The current instant.
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// The current instant truncated to whole seconds.
    pub fn now_seconds() -> Self {
        Self::now().truncate_seconds()
    }

    /// Drop sub-second precision.
    pub fn truncate_seconds(self) -> Self {
        Self(self.0.with_nanosecond(0).unwrap_or(self.0))
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&format_datetime(&self.0))
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
