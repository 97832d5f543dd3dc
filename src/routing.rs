//! Recipient and subject resolution for an ingested payload.

use serde::Serialize;

use crate::config::ServiceConfig;
use crate::json::{nonblank_field, JsonObject};

/// Where an ingested payload goes and under which subject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoutingDecision {
    pub recipient: String,
    pub subject: String,
}

impl RoutingDecision {
    /// Resolve routing for `payload`.
    ///
    /// The payload's `to` replaces the default recipient only when the
    /// configuration allows overrides. Its `subject` replaces the default
    /// subject unconditionally. Both must be non-blank strings and are
    /// trimmed.
    pub fn resolve(payload: &JsonObject, config: &ServiceConfig) -> Self {
        let recipient = nonblank_field(payload, "to")
            .filter(|_| config.allow_to_override)
            .unwrap_or(config.default_to.as_str());

        let subject = nonblank_field(payload, "subject").unwrap_or(config.default_subject.as_str());

        Self {
            recipient: recipient.to_string(),
            subject: subject.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Cli, Environment};
    use crate::json::require_object;
    use serde_json::json;

    fn config(allow_to_override: bool) -> ServiceConfig {
        let mut config = ServiceConfig::resolve(
            &Cli::default(),
            &Environment::from_pairs([
                ("SMTP_HOST", "smtp.example.com"),
                ("SMTP_FROM", "relay@example.com"),
                ("DEFAULT_TO", "ops@example.com"),
                ("DEFAULT_SUBJECT", "Report"),
            ]),
        )
        .unwrap();
        config.allow_to_override = allow_to_override;
        config
    }

    fn route(payload: serde_json::Value, allow: bool) -> RoutingDecision {
        RoutingDecision::resolve(&require_object(payload).unwrap(), &config(allow))
    }

    #[test]
    fn test_defaults() {
        let decision = route(json!({"a": 1}), false);
        assert_eq!(decision.recipient, "ops@example.com");
        assert_eq!(decision.subject, "Report");
    }

    #[test]
    fn test_to_override_requires_permission() {
        assert_eq!(route(json!({"to": "x@y.com"}), false).recipient, "ops@example.com");
        assert_eq!(route(json!({"to": "  x@y.com  "}), true).recipient, "x@y.com");
    }

    #[test]
    fn test_blank_or_non_string_to_ignored() {
        for to in [json!("   "), json!(""), json!(42), json!(null), json!(["x@y.com"])] {
            assert_eq!(route(json!({"to": to}), true).recipient, "ops@example.com");
        }
    }

    #[test]
    fn test_subject_override_ungated() {
        for allow in [false, true] {
            assert_eq!(route(json!({"subject": "  Weekly  "}), allow).subject, "Weekly");
            assert_eq!(route(json!({"subject": "  "}), allow).subject, "Report");
            assert_eq!(route(json!({"subject": 5}), allow).subject, "Report");
        }
    }
}
