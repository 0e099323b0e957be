// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Per-stream metadata: schema, validator, key and freshness properties.
//!
//! The registry is owned by the replication loop and lent to the key builder
//! and resolver. A schema message replaces the whole entry for its stream;
//! there is no merging with a previous definition and no deletion.
//!
//! Schemas are draft 4. `format` is an annotation only: values are never
//! checked against it. `multipleOf` is decided in decimal arithmetic, so
//! `19.99` is a multiple of `0.01` even though the f64 quotient is not whole.

use crate::error::{ReplicationError, Result};
use bigdecimal::BigDecimal;
use jsonschema::error::ValidationErrorKind;
use jsonschema::{Draft, JSONSchema, ValidationError};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// Why a record failed schema validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaViolation {
    pub message: String,
    /// JSON pointer into the record, e.g. `/amount`. Empty for the root.
    pub path: String,
}

impl fmt::Display for SchemaViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at .{}", self.message, self.path.trim_start_matches('/').replace('/', "."))
    }
}

/// Everything known about one stream.
pub struct StreamInfo {
    pub schema: Value,
    validator: JSONSchema,
    pub key_properties: Vec<String>,
    pub bookmark_properties: Option<Vec<String>>,
}

impl fmt::Debug for StreamInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamInfo")
            .field("schema", &self.schema)
            .field("key_properties", &self.key_properties)
            .field("bookmark_properties", &self.bookmark_properties)
            .finish_non_exhaustive()
    }
}

impl StreamInfo {
    /// Compile the schema (draft 4, formats not asserted) and build the
    /// stream entry.
    pub fn new(
        stream: &str,
        schema: Value,
        key_properties: Vec<String>,
        bookmark_properties: Option<Vec<String>>,
    ) -> Result<Self> {
        let validator = JSONSchema::options()
            .with_draft(Draft::Draft4)
            .should_validate_formats(false)
            .compile(&schema)
            .map_err(|e| ReplicationError::Schema {
                stream: stream.to_string(),
                message: e.to_string(),
            })?;
        Ok(Self {
            schema,
            validator,
            key_properties,
            bookmark_properties,
        })
    }

    /// The key property, if exactly one is configured.
    pub fn key_property(&self) -> Option<&str> {
        match self.key_properties.as_slice() {
            [only] => Some(only.as_str()),
            _ => None,
        }
    }

    /// The first bookmark property, if any are configured.
    pub fn freshness_property(&self) -> Option<&str> {
        self.bookmark_properties
            .as_deref()
            .and_then(|props| props.first())
            .map(String::as_str)
    }

    /// Validate a record, reporting the first violation found.
    pub fn validate(&self, record: &Value) -> std::result::Result<(), SchemaViolation> {
        let Err(errors) = self.validator.validate(record) else {
            return Ok(());
        };
        for e in errors {
            if is_decimal_multiple(&e) {
                continue;
            }
            return Err(SchemaViolation {
                message: e.to_string(),
                path: e.instance_path.to_string(),
            });
        }
        Ok(())
    }
}

/// True if a `multipleOf` failure does not hold once both numbers are
/// taken at their decimal (JSON text) value.
fn is_decimal_multiple(error: &ValidationError<'_>) -> bool {
    let ValidationErrorKind::MultipleOf { multiple_of } = &error.kind else {
        return false;
    };
    let Value::Number(item) = error.instance.as_ref() else {
        return false;
    };
    let (Ok(item), Ok(divisor)) = (
        BigDecimal::from_str(&item.to_string()),
        BigDecimal::from_str(&multiple_of.to_string()),
    ) else {
        return false;
    };
    let zero = BigDecimal::from(0);
    divisor != zero && &item % &divisor == zero
}

/// Mapping from stream name to its current definition.
#[derive(Debug, Default)]
pub struct StreamRegistry {
    streams: HashMap<String, StreamInfo>,
}

impl StreamRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) a stream definition.
    ///
    /// Fails if the schema document cannot be compiled; the previous
    /// definition, if any, is left untouched in that case.
    pub fn register_schema(
        &mut self,
        stream: &str,
        schema: Value,
        key_properties: Vec<String>,
        bookmark_properties: Option<Vec<String>>,
    ) -> Result<()> {
        let info = StreamInfo::new(stream, schema, key_properties, bookmark_properties)?;
        let replaced = self.streams.insert(stream.to_string(), info).is_some();
        debug!(stream = %stream, replaced, "Registered stream schema");
        Ok(())
    }

    pub fn lookup(&self, stream: &str) -> Option<&StreamInfo> {
        self.streams.get(stream)
    }

    pub fn len(&self) -> usize {
        self.streams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.streams.is_empty()
    }
}
