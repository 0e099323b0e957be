// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Error types for the replication target.
//!
//! Only run-level failures live here. A record that is rejected (unknown
//! stream, bad key, schema violation) or skipped (not newer, tombstoned) is
//! not an error: it is reported as a value, logged, and the run continues.
//!
//! # Error Categories
//!
//! | Error Type | Retryable | Description |
//! |------------|-----------|-------------|
//! | `Redis` | Yes | Network errors, timeouts, connection failures |
//! | `Store` | Depends | Store operation failed (see [`StoreError`]) |
//! | `Config` | No | Configuration invalid |
//! | `MessageParse` | No | Input line is not a valid message |
//! | `Schema` | No | Schema document cannot be compiled |
//! | `CorruptEntry` | No | Stored value cannot be decoded |
//! | `Io` | No | Reading input or writing output failed |
//! | `Internal` | No | Unexpected internal error |
//!
//! Fencing conflicts ([`StoreError::AlreadyExists`],
//! [`StoreError::RevisionMismatch`]) end the run. Use
//! [`ReplicationError::is_conflict()`] to tell them apart from outages.

use crate::store::StoreError;
use thiserror::Error;

/// Result type alias for replication operations.
pub type Result<T> = std::result::Result<T, ReplicationError>;

/// Errors that abort a replication run.
#[derive(Error, Debug)]
pub enum ReplicationError {
    /// Redis connection or command error.
    ///
    /// Raised while connecting to the store or running a command on it.
    #[error("Redis error ({operation}): {message}")]
    Redis {
        operation: String,
        message: String,
        #[source]
        source: Option<redis::RedisError>,
    },

    /// A key-value store operation failed.
    #[error("Store error ({operation} {key}): {source}")]
    Store {
        operation: &'static str,
        key: String,
        #[source]
        source: StoreError,
    },

    /// Invalid or missing configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// An input line could not be decoded into a message.
    ///
    /// The offending line is kept so the operator can find it upstream.
    #[error("Unable to parse message ({message}): {line:?}")]
    MessageParse { line: String, message: String },

    /// A schema message carried a schema that cannot be compiled.
    #[error("Invalid schema for stream {stream}: {message}")]
    Schema { stream: String, message: String },

    /// An existing store entry holds a value that is not a JSON record.
    #[error("Corrupt entry {key}: {message}")]
    CorruptEntry { key: String, message: String },

    /// Reading the input channel or writing the output channel failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ReplicationError {
    /// Create a Redis error from a redis::RedisError
    pub fn redis(operation: impl Into<String>, source: redis::RedisError) -> Self {
        Self::Redis {
            operation: operation.into(),
            message: source.to_string(),
            source: Some(source),
        }
    }

    /// Create a Redis error without source
    pub fn redis_msg(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Redis {
            operation: operation.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Wrap a failed store operation.
    pub fn store(operation: &'static str, key: impl Into<String>, source: StoreError) -> Self {
        Self::Store {
            operation,
            key: key.into(),
            source,
        }
    }

    /// Check if this error is a revision-fencing conflict with another writer.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Store { source, .. } if source.is_conflict())
    }

    /// Check if this error is retryable
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Redis { .. } => true, // Network errors are retryable
            Self::Store { source, .. } => matches!(source, StoreError::Backend(_)),
            Self::Config(_) => false,
            Self::MessageParse { .. } => false, // Bad input stays bad
            Self::Schema { .. } => false,
            Self::CorruptEntry { .. } => false,
            Self::Io(_) => false,
            Self::Internal(_) => false,
        }
    }
}
