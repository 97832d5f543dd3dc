//! `.env`-style override file parsing.
//!
//! One `KEY=VALUE` per line. Blank lines and `#` comments are skipped, a
//! leading `export ` is dropped, and a value wrapped in matching single or
//! double quotes is unwrapped. Lines without `=` or with an empty key are
//! ignored.

use std::path::Path;

use crate::error::ConfigError;

/// Parse override file contents into ordered key/value pairs.
pub fn parse(contents: &str) -> Vec<(String, String)> {
    contents.lines().filter_map(parse_line).collect()
}

/// Read and parse an override file.
pub fn load(path: &Path) -> Result<Vec<(String, String)>, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::EnvFile {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;
    Ok(parse(&contents))
}

fn parse_line(line: &str) -> Option<(String, String)> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }
    let line = line.strip_prefix("export ").map(str::trim_start).unwrap_or(line);

    let (key, value) = line.split_once('=')?;
    let key = key.trim();
    if key.is_empty() {
        return None;
    }

    Some((key.to_string(), unquote(value.trim()).to_string()))
}

fn unquote(value: &str) -> &str {
    let bytes = value.as_bytes();
    if bytes.len() >= 2 {
        let (first, last) = (bytes[0], bytes[bytes.len() - 1]);
        if first == last && (first == b'"' || first == b'\'') {
            return &value[1..value.len() - 1];
        }
    }
    value
}
