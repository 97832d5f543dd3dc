//! Service configuration.
//!
//! Every field resolves in the same order: explicit CLI value, then the
//! environment, then the override file, then the built-in default. The
//! override file only fills keys the process environment does not already
//! have, so the environment always wins over the file.
//!
//! | Variable | Description |
//! |----------|-------------|
//! | `BIND_HOST` / `BIND_PORT` | Listener address (default `127.0.0.1:8080`) |
//! | `ENV_FILE` | Override file (default `.env`, skipped if absent) |
//! | `DEFAULT_TO` | Default recipient |
//! | `DEFAULT_SUBJECT` | Default subject line |
//! | `ALLOW_TO_OVERRIDE` | Let the payload's `to` field replace `DEFAULT_TO` |
//! | `MAX_BODY_BYTES` | Largest accepted `Content-Length` |
//! | `SMTP_HOST` / `SMTP_PORT` | SMTP server (port default 587) |
//! | `SMTP_USER` / `SMTP_PASS` | SMTP credentials, used only when both are set |
//! | `SMTP_STARTTLS` | Require STARTTLS (default true) |
//! | `SMTP_TIMEOUT_SECS` | Transport timeout (default 30) |
//! | `SMTP_FROM` | Sender address |
//! | `MAIL_TRANSPORT` | `smtp` or `log` (dry run) |
//! | `LOG_FORMAT` | `text` or `json` |

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use email_address::EmailAddress;

use crate::env_file;
use crate::error::ConfigError;

pub const DEFAULT_BIND_HOST: &str = "127.0.0.1";
pub const DEFAULT_BIND_PORT: u16 = 8080;
pub const DEFAULT_ENV_FILE: &str = ".env";
pub const DEFAULT_SUBJECT: &str = "JSON Relay Payload";
pub const DEFAULT_MAX_BODY_BYTES: u64 = 10 * 1024 * 1024;
pub const DEFAULT_SMTP_PORT: u16 = 587;
pub const DEFAULT_SMTP_TIMEOUT_SECS: u64 = 30;

/// Command-line arguments. Anything left unset falls through to the environment.
#[derive(Debug, Clone, Default, Parser)]
#[command(name = "json-relay", version, about = "Receive JSON over HTTP and relay it by email", long_about = None)]
pub struct Cli {
    /// Bind host
    #[arg(long)]
    pub host: Option<String>,

    /// Bind port
    #[arg(long)]
    pub port: Option<u16>,

    /// Override file with KEY=VALUE lines
    #[arg(long, value_name = "PATH")]
    pub env_file: Option<PathBuf>,

    /// Default recipient
    #[arg(long)]
    pub default_to: Option<String>,

    /// Default subject
    #[arg(long)]
    pub subject: Option<String>,

    /// Allow the request JSON to set 'to'
    #[arg(long)]
    pub allow_to_override: bool,

    /// Largest accepted request body in bytes
    #[arg(long, allow_negative_numbers = true)]
    pub max_body_bytes: Option<i64>,

    /// SMTP server host
    #[arg(long)]
    pub smtp_host: Option<String>,

    /// SMTP server port
    #[arg(long)]
    pub smtp_port: Option<u16>,

    /// SMTP username
    #[arg(long)]
    pub smtp_user: Option<String>,

    /// SMTP password
    #[arg(long)]
    pub smtp_pass: Option<String>,

    /// Require STARTTLS (true/false)
    #[arg(long, value_parser = clap::builder::BoolishValueParser::new())]
    pub smtp_starttls: Option<bool>,

    /// SMTP timeout in seconds
    #[arg(long)]
    pub smtp_timeout: Option<u64>,

    /// Sender address
    #[arg(long)]
    pub from: Option<String>,

    /// Outbound transport
    #[arg(long, value_enum)]
    pub transport: Option<TransportKind>,

    /// Log output format
    #[arg(long, value_enum)]
    pub log_format: Option<LogFormat>,
}

/// Which transport the relay hands messages to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum TransportKind {
    /// Deliver over SMTP.
    #[default]
    Smtp,
    /// Log the message instead of sending it.
    Log,
}

/// Log line format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Snapshot of environment variables, optionally merged with an override file.
///
/// Resolution reads from this snapshot rather than the live process
/// environment, so tests can build one from literal pairs.
#[derive(Debug, Clone, Default)]
pub struct Environment {
    vars: HashMap<String, String>,
}

impl Environment {
    /// Capture the current process environment.
    pub fn from_process() -> Self {
        Self::from_pairs(std::env::vars())
    }

    /// Build from explicit key/value pairs.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Add entries for keys that are not already present.
    pub fn merge_missing<I>(&mut self, entries: I)
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (key, value) in entries {
            self.vars.entry(key).or_insert(value);
        }
    }

    /// Trimmed value for `key`, or `None` if unset or blank.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars
            .get(key)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }
}

/// SMTP transport settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmtpSettings {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub starttls: bool,
    pub timeout: Duration,
}

impl SmtpSettings {
    /// Credentials, only when both username and password are present.
    pub fn credentials(&self) -> Option<(&str, &str)> {
        match (&self.username, &self.password) {
            (Some(user), Some(pass)) => Some((user.as_str(), pass.as_str())),
            _ => None,
        }
    }
}

/// Immutable service configuration, built once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    pub bind_host: String,
    pub bind_port: u16,
    pub smtp: SmtpSettings,
    pub mail_from: String,
    pub default_to: String,
    pub default_subject: String,
    pub allow_to_override: bool,
    pub max_body_bytes: u64,
    pub transport: TransportKind,
    pub log_format: LogFormat,
}

impl ServiceConfig {
    /// Resolve from CLI arguments, the process environment and the override file.
    pub fn load(cli: &Cli) -> Result<Self, ConfigError> {
        let mut env = Environment::from_process();

        let explicit = cli
            .env_file
            .clone()
            .or_else(|| env.get("ENV_FILE").map(PathBuf::from));
        match explicit {
            Some(path) => env.merge_missing(env_file::load(&path)?),
            None => {
                let path = Path::new(DEFAULT_ENV_FILE);
                if path.is_file() {
                    env.merge_missing(env_file::load(path)?);
                }
            }
        }

        Self::resolve(cli, &env)
    }

    /// Resolve from CLI arguments and an environment snapshot, then validate.
    pub fn resolve(cli: &Cli, env: &Environment) -> Result<Self, ConfigError> {
        let bind_host = pick(cli.host.as_deref(), env, "BIND_HOST")
            .unwrap_or_else(|| DEFAULT_BIND_HOST.to_string());
        let bind_port = number(cli.port, env, "BIND_PORT", DEFAULT_BIND_PORT)?;

        let smtp = SmtpSettings {
            host: pick(cli.smtp_host.as_deref(), env, "SMTP_HOST").unwrap_or_default(),
            port: number(cli.smtp_port, env, "SMTP_PORT", DEFAULT_SMTP_PORT)?,
            username: pick(cli.smtp_user.as_deref(), env, "SMTP_USER"),
            password: pick(cli.smtp_pass.as_deref(), env, "SMTP_PASS"),
            starttls: cli
                .smtp_starttls
                .unwrap_or_else(|| parse_bool(env.get("SMTP_STARTTLS"), true)),
            timeout: Duration::from_secs(number(
                cli.smtp_timeout,
                env,
                "SMTP_TIMEOUT_SECS",
                DEFAULT_SMTP_TIMEOUT_SECS,
            )?),
        };

        let max_body_bytes: i64 = number(
            cli.max_body_bytes,
            env,
            "MAX_BODY_BYTES",
            DEFAULT_MAX_BODY_BYTES as i64,
        )?;
        if max_body_bytes <= 0 {
            return Err(ConfigError::invalid(
                "MAX_BODY_BYTES",
                &max_body_bytes.to_string(),
                "must be positive",
            ));
        }

        let transport = match cli.transport {
            Some(kind) => kind,
            None => enum_value(env, "MAIL_TRANSPORT")?.unwrap_or_default(),
        };
        let log_format = match cli.log_format {
            Some(format) => format,
            None => enum_value(env, "LOG_FORMAT")?.unwrap_or_default(),
        };

        let config = Self {
            bind_host,
            bind_port,
            smtp,
            mail_from: pick(cli.from.as_deref(), env, "SMTP_FROM").unwrap_or_default(),
            default_to: pick(cli.default_to.as_deref(), env, "DEFAULT_TO").unwrap_or_default(),
            default_subject: pick(cli.subject.as_deref(), env, "DEFAULT_SUBJECT")
                .unwrap_or_else(|| DEFAULT_SUBJECT.to_string()),
            allow_to_override: cli.allow_to_override
                || parse_bool(env.get("ALLOW_TO_OVERRIDE"), false),
            max_body_bytes: max_body_bytes as u64,
            transport,
            log_format,
        };

        config.validate()?;
        Ok(config)
    }

    /// Check the invariants the listener relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.transport == TransportKind::Smtp && self.smtp.host.trim().is_empty() {
            return Err(ConfigError::Missing("SMTP_HOST"));
        }
        if self.mail_from.trim().is_empty() {
            return Err(ConfigError::Missing("SMTP_FROM"));
        }
        if self.default_to.trim().is_empty() && !self.allow_to_override {
            return Err(ConfigError::MissingDefaultRecipient);
        }
        if self.max_body_bytes == 0 {
            return Err(ConfigError::invalid("MAX_BODY_BYTES", "0", "must be positive"));
        }
        if self.smtp.timeout.is_zero() {
            return Err(ConfigError::invalid("SMTP_TIMEOUT_SECS", "0", "must be positive"));
        }

        Ok(())
    }

    /// Log the resolved settings, without secrets, and flag odd addresses.
    pub fn log_summary(&self) {
        tracing::info!(
            bind = %self.bind_addr(),
            transport = ?self.transport,
            smtp_host = %self.smtp.host,
            smtp_port = self.smtp.port,
            starttls = self.smtp.starttls,
            authenticated = self.smtp.credentials().is_some(),
            from = %self.mail_from,
            default_to = %self.default_to,
            allow_to_override = self.allow_to_override,
            "Configuration loaded"
        );

        for (key, addr) in [("SMTP_FROM", &self.mail_from), ("DEFAULT_TO", &self.default_to)] {
            if !addr.is_empty() && !EmailAddress::is_valid(addr) {
                tracing::warn!(key, address = %addr, "Address does not look like a valid email address");
            }
        }
    }

    /// `host:port` the listener binds to.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.bind_host, self.bind_port)
    }
}

/// Parse a boolean setting. Unset or blank yields `default`; otherwise the
/// value is true iff it is one of `1`, `true`, `yes`, `y`, `on` (any case).
pub fn parse_bool(value: Option<&str>, default: bool) -> bool {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        None => default,
        Some(v) => matches!(
            v.to_ascii_lowercase().as_str(),
            "1" | "true" | "yes" | "y" | "on"
        ),
    }
}

fn pick(cli: Option<&str>, env: &Environment, key: &str) -> Option<String> {
    cli.map(str::trim)
        .filter(|v| !v.is_empty())
        .or_else(|| env.get(key))
        .map(str::to_string)
}

fn number<T>(cli: Option<T>, env: &Environment, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    if let Some(value) = cli {
        return Ok(value);
    }
    match env.get(key) {
        Some(raw) => raw.parse().map_err(|e| ConfigError::invalid(key, raw, e)),
        None => Ok(default),
    }
}

fn enum_value<T: ValueEnum>(env: &Environment, key: &'static str) -> Result<Option<T>, ConfigError> {
    env.get(key)
        .map(|raw| <T as ValueEnum>::from_str(raw, true).map_err(|e| ConfigError::invalid(key, raw, e)))
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_env() -> Vec<(&'static str, &'static str)> {
        vec![
            ("SMTP_HOST", "smtp.example.com"),
            ("SMTP_FROM", "relay@example.com"),
            ("DEFAULT_TO", "ops@example.com"),
        ]
    }

    fn resolve(cli: &Cli, pairs: Vec<(&str, &str)>) -> Result<ServiceConfig, ConfigError> {
        ServiceConfig::resolve(cli, &Environment::from_pairs(pairs))
    }

    #[test]
    fn test_defaults() {
        let config = resolve(&Cli::default(), base_env()).unwrap();
        assert_eq!(config.bind_addr(), "127.0.0.1:8080");
        assert_eq!(config.smtp.port, 587);
        assert!(config.smtp.starttls);
        assert_eq!(config.smtp.timeout, Duration::from_secs(30));
        assert_eq!(config.smtp.credentials(), None);
        assert_eq!(config.default_subject, DEFAULT_SUBJECT);
        assert!(!config.allow_to_override);
        assert_eq!(config.max_body_bytes, DEFAULT_MAX_BODY_BYTES);
        assert_eq!(config.transport, TransportKind::Smtp);
        assert_eq!(config.log_format, LogFormat::Text);
    }

    #[test]
    fn test_cli_beats_env() {
        let cli = Cli {
            default_to: Some("cli@example.com".into()),
            subject: Some("From CLI".into()),
            port: Some(9000),
            ..Default::default()
        };
        let mut env = base_env();
        env.push(("DEFAULT_SUBJECT", "From env"));
        env.push(("BIND_PORT", "7000"));

        let config = resolve(&cli, env).unwrap();
        assert_eq!(config.default_to, "cli@example.com");
        assert_eq!(config.default_subject, "From CLI");
        assert_eq!(config.bind_port, 9000);
    }

    #[test]
    fn test_blank_cli_falls_through() {
        let cli = Cli {
            default_to: Some("   ".into()),
            ..Default::default()
        };
        let config = resolve(&cli, base_env()).unwrap();
        assert_eq!(config.default_to, "ops@example.com");
    }

    #[test]
    fn test_blank_subject_uses_default() {
        let mut env = base_env();
        env.push(("DEFAULT_SUBJECT", "   "));
        let config = resolve(&Cli::default(), env).unwrap();
        assert_eq!(config.default_subject, DEFAULT_SUBJECT);
    }

    #[test]
    fn test_env_beats_file() {
        let mut env = Environment::from_pairs(base_env());
        env.merge_missing(env_file::parse(
            "DEFAULT_TO=file@example.com\nDEFAULT_SUBJECT='From file'\n",
        ));

        let config = ServiceConfig::resolve(&Cli::default(), &env).unwrap();
        assert_eq!(config.default_to, "ops@example.com");
        assert_eq!(config.default_subject, "From file");
    }

    #[test]
    fn test_parse_bool() {
        for truthy in ["1", "true", "TRUE", "Yes", "y", "On", " on "] {
            assert!(parse_bool(Some(truthy), false), "{truthy}");
        }
        for falsy in ["0", "false", "no", "off", "maybe"] {
            assert!(!parse_bool(Some(falsy), true), "{falsy}");
        }
        assert!(parse_bool(None, true));
        assert!(parse_bool(Some(""), true));
        assert!(!parse_bool(Some("  "), false));
    }

    #[test]
    fn test_starttls_and_override_flags() {
        let mut env = base_env();
        env.push(("SMTP_STARTTLS", "off"));
        env.push(("ALLOW_TO_OVERRIDE", "yes"));
        let config = resolve(&Cli::default(), env).unwrap();
        assert!(!config.smtp.starttls);
        assert!(config.allow_to_override);

        let cli = Cli {
            smtp_starttls: Some(true),
            allow_to_override: true,
            ..Default::default()
        };
        let mut env = base_env();
        env.push(("SMTP_STARTTLS", "off"));
        let config = resolve(&cli, env).unwrap();
        assert!(config.smtp.starttls);
        assert!(config.allow_to_override);
    }

    #[test]
    fn test_credentials_need_both() {
        let mut env = base_env();
        env.push(("SMTP_USER", "user"));
        let config = resolve(&Cli::default(), env.clone()).unwrap();
        assert_eq!(config.smtp.username.as_deref(), Some("user"));
        assert_eq!(config.smtp.credentials(), None);

        env.push(("SMTP_PASS", "secret"));
        let config = resolve(&Cli::default(), env).unwrap();
        assert_eq!(config.smtp.credentials(), Some(("user", "secret")));
    }

    #[test]
    fn test_missing_smtp_host() {
        let env = vec![("SMTP_FROM", "relay@example.com"), ("DEFAULT_TO", "ops@example.com")];
        assert_eq!(
            resolve(&Cli::default(), env).unwrap_err(),
            ConfigError::Missing("SMTP_HOST")
        );
    }

    #[test]
    fn test_log_transport_needs_no_host() {
        let env = vec![
            ("SMTP_FROM", "relay@example.com"),
            ("DEFAULT_TO", "ops@example.com"),
            ("MAIL_TRANSPORT", "log"),
        ];
        let config = resolve(&Cli::default(), env).unwrap();
        assert_eq!(config.transport, TransportKind::Log);
    }

    #[test]
    fn test_missing_sender() {
        let env = vec![("SMTP_HOST", "smtp.example.com"), ("DEFAULT_TO", "ops@example.com")];
        assert_eq!(
            resolve(&Cli::default(), env).unwrap_err(),
            ConfigError::Missing("SMTP_FROM")
        );
    }

    #[test]
    fn test_missing_default_to() {
        let env = vec![("SMTP_HOST", "smtp.example.com"), ("SMTP_FROM", "relay@example.com")];
        assert_eq!(
            resolve(&Cli::default(), env.clone()).unwrap_err(),
            ConfigError::MissingDefaultRecipient
        );

        let cli = Cli {
            allow_to_override: true,
            ..Default::default()
        };
        let config = resolve(&cli, env).unwrap();
        assert!(config.default_to.is_empty());
    }

    #[test]
    fn test_body_ceiling_must_be_positive() {
        for raw in ["0", "-1"] {
            let mut env = base_env();
            env.push(("MAX_BODY_BYTES", raw));
            let err = resolve(&Cli::default(), env).unwrap_err();
            assert!(matches!(err, ConfigError::Invalid { key: "MAX_BODY_BYTES", .. }));
        }
    }

    #[test]
    fn test_invalid_numbers() {
        let mut env = base_env();
        env.push(("SMTP_PORT", "not-a-port"));
        let err = resolve(&Cli::default(), env).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "SMTP_PORT", .. }));

        let mut env = base_env();
        env.push(("SMTP_TIMEOUT_SECS", "0"));
        let err = resolve(&Cli::default(), env).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "SMTP_TIMEOUT_SECS", .. }));
    }

    #[test]
    fn test_invalid_transport() {
        let mut env = base_env();
        env.push(("MAIL_TRANSPORT", "pigeon"));
        let err = resolve(&Cli::default(), env).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "MAIL_TRANSPORT", .. }));
    }

    #[test]
    fn test_cli_parses_flags() {
        let cli = Cli::parse_from([
            "json-relay",
            "--port",
            "9090",
            "--allow-to-override",
            "--smtp-starttls",
            "false",
            "--max-body-bytes",
            "2048",
            "--transport",
            "log",
        ]);
        assert_eq!(cli.port, Some(9090));
        assert!(cli.allow_to_override);
        assert_eq!(cli.smtp_starttls, Some(false));
        assert_eq!(cli.max_body_bytes, Some(2048));
        assert_eq!(cli.transport, Some(TransportKind::Log));
    }
}
