// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Redis-backed [`KvStore`].
//!
//! # Layout
//!
//! ```text
//! {bucket}:{key}            HASH   value => <serialized record>, revision => <u64>
//! {bucket}:__revision__     STRING monotonically increasing revision counter
//! ```
//!
//! Replicated keys always contain a `.`, so they never collide with the
//! counter key.
//!
//! # Fencing
//!
//! `create`, `update` and `put` run as Lua scripts. Redis executes a script
//! atomically, so the existence / revision check and the write cannot be
//! interleaved with another client's write. No client-side lock is taken.
//!
//! # Connection
//!
//! A single [`ConnectionManager`] is opened at startup, bounded by the
//! configured timeout. Cloning it per operation is cheap (it is multiplexed).

use crate::config::TargetConfig;
use crate::error::{ReplicationError, Result};
use crate::store::{BoxFuture, KvStore, StoreEntry, StoreError};
use redis::aio::ConnectionManager;
use redis::{IntoConnectionInfo, Script};
use std::sync::OnceLock;
use tokio::time::timeout;
use tracing::info;

const CREATE_SCRIPT: &str = r#"
local current = redis.call('HGET', KEYS[1], 'revision')
if current then
  return {0, tonumber(current)}
end
local rev = redis.call('INCR', KEYS[2])
redis.call('HSET', KEYS[1], 'value', ARGV[1], 'revision', rev)
return {1, rev}
"#;

const UPDATE_SCRIPT: &str = r#"
local current = redis.call('HGET', KEYS[1], 'revision')
if (not current) or tonumber(current) ~= tonumber(ARGV[2]) then
  if current then
    return {0, tonumber(current)}
  end
  return {0, -1}
end
local rev = redis.call('INCR', KEYS[2])
redis.call('HSET', KEYS[1], 'value', ARGV[1], 'revision', rev)
return {1, rev}
"#;

const PUT_SCRIPT: &str = r#"
local rev = redis.call('INCR', KEYS[2])
redis.call('HSET', KEYS[1], 'value', ARGV[1], 'revision', rev)
return rev
"#;

fn create_script() -> &'static Script {
    static SCRIPT: OnceLock<Script> = OnceLock::new();
    SCRIPT.get_or_init(|| Script::new(CREATE_SCRIPT))
}

fn update_script() -> &'static Script {
    static SCRIPT: OnceLock<Script> = OnceLock::new();
    SCRIPT.get_or_init(|| Script::new(UPDATE_SCRIPT))
}

fn put_script() -> &'static Script {
    static SCRIPT: OnceLock<Script> = OnceLock::new();
    SCRIPT.get_or_init(|| Script::new(PUT_SCRIPT))
}

fn backend(operation: &str, e: redis::RedisError) -> StoreError {
    StoreError::Backend(format!("{}: {}", operation, e))
}

/// Redis key holding the hash for a store key.
pub fn entry_key(bucket: &str, key: &str) -> String {
    format!("{}:{}", bucket, key)
}

/// Redis key holding the bucket's revision counter.
pub fn revision_key(bucket: &str) -> String {
    format!("{}:__revision__", bucket)
}

/// A bucket in Redis exposing the versioned store operations.
#[derive(Clone)]
pub struct RedisKvStore {
    conn: ConnectionManager,
    bucket: String,
    revision_key: String,
}

impl RedisKvStore {
    /// Wrap an existing connection.
    pub fn new(conn: ConnectionManager, bucket: impl Into<String>) -> Self {
        let bucket = bucket.into();
        let revision_key = revision_key(&bucket);
        Self {
            conn,
            bucket,
            revision_key,
        }
    }

    /// Connect using the configured endpoint, credentials and bucket.
    pub async fn connect(config: &TargetConfig) -> Result<Self> {
        let mut info = config
            .url
            .as_str()
            .into_connection_info()
            .map_err(|e| ReplicationError::redis("CONNECT", e))?;
        if let Some(user) = &config.user {
            info.redis.username = Some(user.clone());
        }
        if let Some(password) = &config.password {
            info.redis.password = Some(password.clone());
        }

        let client = redis::Client::open(info).map_err(|e| ReplicationError::redis("CONNECT", e))?;
        let conn = timeout(config.connection_timeout(), client.get_connection_manager())
            .await
            .map_err(|_| {
                ReplicationError::redis_msg(
                    "CONNECT",
                    format!("timed out after {}s", config.connection_timeout_sec),
                )
            })?
            .map_err(|e| ReplicationError::redis("CONNECT", e))?;

        info!(bucket = %config.bucket, "Connected to key-value store");
        Ok(Self::new(conn, config.bucket.clone()))
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }
}

impl KvStore for RedisKvStore {
    fn get(&self, key: &str) -> BoxFuture<'_, Option<StoreEntry>> {
        let redis_key = entry_key(&self.bucket, key);
        let mut conn = self.conn.clone();
        Box::pin(async move {
            let (value, revision): (Option<Vec<u8>>, Option<u64>) = redis::cmd("HMGET")
                .arg(&redis_key)
                .arg("value")
                .arg("revision")
                .query_async(&mut conn)
                .await
                .map_err(|e| backend("HMGET", e))?;

            Ok(revision.map(|revision| StoreEntry {
                value: value.unwrap_or_default(),
                revision,
            }))
        })
    }

    fn create(&self, key: &str, value: Vec<u8>) -> BoxFuture<'_, u64> {
        let redis_key = entry_key(&self.bucket, key);
        let mut conn = self.conn.clone();
        Box::pin(async move {
            let (ok, revision): (i64, i64) = create_script()
                .key(&redis_key)
                .key(&self.revision_key)
                .arg(value)
                .invoke_async(&mut conn)
                .await
                .map_err(|e| backend("CREATE", e))?;
            if ok == 1 {
                Ok(revision as u64)
            } else {
                Err(StoreError::AlreadyExists)
            }
        })
    }

    fn update(&self, key: &str, value: Vec<u8>, expected_revision: u64) -> BoxFuture<'_, u64> {
        let redis_key = entry_key(&self.bucket, key);
        let mut conn = self.conn.clone();
        Box::pin(async move {
            let (ok, revision): (i64, i64) = update_script()
                .key(&redis_key)
                .key(&self.revision_key)
                .arg(value)
                .arg(expected_revision)
                .invoke_async(&mut conn)
                .await
                .map_err(|e| backend("UPDATE", e))?;
            if ok == 1 {
                Ok(revision as u64)
            } else {
                Err(StoreError::RevisionMismatch {
                    expected: expected_revision,
                    actual: u64::try_from(revision).ok(),
                })
            }
        })
    }

    fn put(&self, key: &str, value: Vec<u8>) -> BoxFuture<'_, u64> {
        let redis_key = entry_key(&self.bucket, key);
        let mut conn = self.conn.clone();
        Box::pin(async move {
            let revision: u64 = put_script()
                .key(&redis_key)
                .key(&self.revision_key)
                .arg(value)
                .invoke_async(&mut conn)
                .await
                .map_err(|e| backend("PUT", e))?;
            Ok(revision)
        })
    }
}
