// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Store key derivation.
//!
//! A record's key is `<prefix><stream>.<primary key value>`. The primary key
//! value becomes a single key token, so it must not be empty, must not start
//! with `$`, and must not contain a space, `.`, `*`, `>` or NUL.

use crate::registry::StreamInfo;
use serde_json::{Map, Value};
use thiserror::Error;

/// Characters that may not appear in a primary key value.
pub const FORBIDDEN_KEY_CHARS: [char; 5] = [' ', '.', '*', '>', '\0'];

/// Why a record could not be keyed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KeyRejection {
    #[error("stream needs exactly one key property")]
    KeyPropertyCount,
    #[error("record is missing key property {0}")]
    MissingKeyProperty(String),
    #[error("primary key is empty")]
    EmptyKey,
    #[error("primary key starts with reserved prefix $")]
    ReservedPrefix,
    #[error("primary key contains invalid character {0:?}")]
    InvalidCharacter(char),
}

impl KeyRejection {
    /// Stable label for metrics.
    pub fn reason(&self) -> &'static str {
        match self {
            KeyRejection::KeyPropertyCount => "key_property_count",
            KeyRejection::MissingKeyProperty(_) => "missing_key_property",
            KeyRejection::EmptyKey => "empty_key",
            KeyRejection::ReservedPrefix => "reserved_prefix",
            KeyRejection::InvalidCharacter(_) => "invalid_character",
        }
    }
}

/// Render a JSON value the way keys and freshness values are compared:
/// strings verbatim, everything else as compact JSON.
pub fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Check a stringified primary key value.
pub fn validate_key_value(value: &str) -> Result<(), KeyRejection> {
    if value.is_empty() {
        return Err(KeyRejection::EmptyKey);
    }
    if value.starts_with('$') {
        return Err(KeyRejection::ReservedPrefix);
    }
    match value.chars().find(|c| FORBIDDEN_KEY_CHARS.contains(c)) {
        Some(c) => Err(KeyRejection::InvalidCharacter(c)),
        None => Ok(()),
    }
}

/// Build the store key for a record of `stream`.
///
/// Returns the key together with the primary key value (for logging).
pub fn build_key(
    prefix: &str,
    stream: &str,
    info: &StreamInfo,
    record: &Map<String, Value>,
) -> Result<(String, String), KeyRejection> {
    let key_property = info.key_property().ok_or(KeyRejection::KeyPropertyCount)?;
    let value = record
        .get(key_property)
        .ok_or_else(|| KeyRejection::MissingKeyProperty(key_property.to_string()))?;

    let primary_key = stringify(value);
    validate_key_value(&primary_key)?;

    Ok((format!("{}{}.{}", prefix, stream, primary_key), primary_key))
}
