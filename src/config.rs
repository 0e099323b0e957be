// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Configuration for the replication target.
//!
//! Configuration is read from a JSON file (`--config`) and passed as plain,
//! already-resolved values to [`RedisKvStore::connect()`](crate::redis_store::RedisKvStore::connect)
//! and [`ReplicationTarget::new()`](crate::ReplicationTarget::new). Every
//! field has a default, so an absent config file yields a working local setup.
//!
//! # Configuration Structure
//!
//! ```text
//! TargetConfig
//! ├── url: String                   # Store endpoint
//! ├── user / password: Option       # Store credentials
//! ├── bucket: String                # Namespace for all keys
//! ├── key_prefix: String            # Prepended to "<stream>.<key>"
//! ├── connection_timeout_sec: u64
//! ├── state_clear_policy            # durable_write | every_record
//! └── freshness_order               # lexicographic | numeric
//! ```
//!
//! # JSON Example
//!
//! ```json
//! {
//!   "url": "redis://kv.internal:6379",
//!   "user": "replicator",
//!   "password": "secret",
//!   "bucket": "singer",
//!   "key_prefix": "v1.",
//!   "freshness_order": "lexicographic"
//! }
//! ```

use crate::error::{ReplicationError, Result};
use crate::freshness::FreshnessOrder;
use crate::state::StateClearPolicy;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Top-level configuration for a replication run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetConfig {
    /// Store endpoint, e.g. `"redis://localhost:6379"`.
    #[serde(default = "default_url")]
    pub url: String,

    /// Username for the store connection.
    #[serde(default)]
    pub user: Option<String>,

    /// Password (or access token) for the store connection.
    #[serde(default, skip_serializing)]
    pub password: Option<String>,

    /// Bucket (namespace) holding all replicated entries.
    #[serde(default = "default_bucket")]
    pub bucket: String,

    /// Prefix prepended to every entry key.
    #[serde(default)]
    pub key_prefix: String,

    /// Timeout for establishing the store connection.
    #[serde(default = "default_connection_timeout_sec")]
    pub connection_timeout_sec: u64,

    /// When the pending checkpoint is cleared by a record.
    #[serde(default)]
    pub state_clear_policy: StateClearPolicy,

    /// How freshness (bookmark) values are ordered.
    #[serde(default)]
    pub freshness_order: FreshnessOrder,
}

fn default_url() -> String {
    "redis://localhost:6379".to_string()
}

fn default_bucket() -> String {
    "singer".to_string()
}

fn default_connection_timeout_sec() -> u64 {
    5
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            user: None,
            password: None,
            bucket: default_bucket(),
            key_prefix: String::new(),
            connection_timeout_sec: default_connection_timeout_sec(),
            state_clear_policy: StateClearPolicy::default(),
            freshness_order: FreshnessOrder::default(),
        }
    }
}

impl TargetConfig {
    /// Load configuration from a JSON file, or defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path).map_err(|e| {
                    ReplicationError::Config(format!("cannot read {}: {}", path.display(), e))
                })?;
                Self::from_json(&raw)?
            }
            None => Self::default(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a JSON document.
    pub fn from_json(raw: &str) -> Result<Self> {
        serde_json::from_str(raw)
            .map_err(|e| ReplicationError::Config(format!("invalid config JSON: {}", e)))
    }

    /// Check the values that the store binding cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.bucket.is_empty() {
            return Err(ReplicationError::Config("bucket must not be empty".into()));
        }
        if self.bucket.contains(':') {
            return Err(ReplicationError::Config(format!(
                "bucket {:?} must not contain ':'",
                self.bucket
            )));
        }
        if self.connection_timeout_sec == 0 {
            return Err(ReplicationError::Config(
                "connection_timeout_sec must be positive".into(),
            ));
        }
        Ok(())
    }

    /// Connection timeout as a Duration.
    pub fn connection_timeout(&self) -> Duration {
        Duration::from_secs(self.connection_timeout_sec)
    }

    /// Create a config for testing.
    pub fn for_testing(key_prefix: &str) -> Self {
        Self {
            key_prefix: key_prefix.to_string(),
            ..Self::default()
        }
    }
}
