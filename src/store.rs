// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Versioned key-value store interface.
//!
//! The resolver only needs four operations. Every entry carries a
//! store-assigned revision; conditional writes are fenced on it, so two
//! writers racing on the same key cannot silently overwrite each other.
//!
//! | Operation | Succeeds when | Fails with |
//! |-----------|---------------|------------|
//! | `get` | always (`None` if absent) | `Backend` |
//! | `create` | key absent | `AlreadyExists` |
//! | `update` | current revision == expected | `RevisionMismatch` |
//! | `put` | always | `Backend` |
//!
//! # Example
//!
//! ```rust,no_run
//! use replication_target::store::{BoxFuture, KvStore, StoreEntry};
//!
//! struct MyStore { /* ... */ }
//!
//! impl KvStore for MyStore {
//!     fn get(&self, _key: &str) -> BoxFuture<'_, Option<StoreEntry>> {
//!         Box::pin(async move { Ok(None) })
//!     }
//!     fn create(&self, _key: &str, _value: Vec<u8>) -> BoxFuture<'_, u64> {
//!         Box::pin(async move { Ok(1) })
//!     }
//!     fn update(&self, _key: &str, _value: Vec<u8>, _expected: u64) -> BoxFuture<'_, u64> {
//!         Box::pin(async move { Ok(2) })
//!     }
//!     fn put(&self, _key: &str, _value: Vec<u8>) -> BoxFuture<'_, u64> {
//!         Box::pin(async move { Ok(3) })
//!     }
//! }
//! ```

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;
use tokio::sync::Mutex;

/// Result type for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Type alias for boxed async futures (reduces trait signature complexity).
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = StoreResult<T>> + Send + 'a>>;

/// A stored value and the revision it was written at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreEntry {
    pub value: Vec<u8>,
    pub revision: u64,
}

/// Store operation failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// `create` found an existing entry.
    #[error("key already exists")]
    AlreadyExists,

    /// `update` found a different revision than expected.
    #[error("wrong last revision: expected {expected}, found {}", .actual.map_or("none".to_string(), |r| r.to_string()))]
    RevisionMismatch { expected: u64, actual: Option<u64> },

    /// Connectivity, permission or store-internal failure.
    #[error("{0}")]
    Backend(String),
}

impl StoreError {
    /// True for fencing failures caused by another writer.
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::AlreadyExists | StoreError::RevisionMismatch { .. })
    }
}

/// Capability to read and write the versioned key-value store.
///
/// Write operations return the revision assigned to the new value.
pub trait KvStore: Send + Sync {
    /// Fetch the current entry for `key`.
    fn get(&self, key: &str) -> BoxFuture<'_, Option<StoreEntry>>;

    /// Write `value` only if `key` does not exist yet.
    fn create(&self, key: &str, value: Vec<u8>) -> BoxFuture<'_, u64>;

    /// Write `value` only if the entry is still at `expected_revision`.
    fn update(&self, key: &str, value: Vec<u8>, expected_revision: u64) -> BoxFuture<'_, u64>;

    /// Write `value` unconditionally.
    fn put(&self, key: &str, value: Vec<u8>) -> BoxFuture<'_, u64>;
}

/// In-process store with the same fencing semantics as the real backend.
///
/// Revisions are drawn from one counter shared by all keys, so they are
/// unique and increase across the whole store.
#[derive(Debug, Default)]
pub struct MemoryKvStore {
    inner: Mutex<MemoryInner>,
}

#[derive(Debug, Default)]
struct MemoryInner {
    entries: HashMap<String, StoreEntry>,
    last_revision: u64,
}

impl MemoryInner {
    fn write(&mut self, key: &str, value: Vec<u8>) -> u64 {
        self.last_revision += 1;
        let revision = self.last_revision;
        self.entries
            .insert(key.to_string(), StoreEntry { value, revision });
        revision
    }
}

impl MemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all entries (for assertions).
    pub async fn entries(&self) -> HashMap<String, StoreEntry> {
        self.inner.lock().await.entries.clone()
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl KvStore for MemoryKvStore {
    fn get(&self, key: &str) -> BoxFuture<'_, Option<StoreEntry>> {
        let key = key.to_string();
        Box::pin(async move { Ok(self.inner.lock().await.entries.get(&key).cloned()) })
    }

    fn create(&self, key: &str, value: Vec<u8>) -> BoxFuture<'_, u64> {
        let key = key.to_string();
        Box::pin(async move {
            let mut inner = self.inner.lock().await;
            if inner.entries.contains_key(&key) {
                return Err(StoreError::AlreadyExists);
            }
            Ok(inner.write(&key, value))
        })
    }

    fn update(&self, key: &str, value: Vec<u8>, expected_revision: u64) -> BoxFuture<'_, u64> {
        let key = key.to_string();
        Box::pin(async move {
            let mut inner = self.inner.lock().await;
            let actual = inner.entries.get(&key).map(|e| e.revision);
            if actual != Some(expected_revision) {
                return Err(StoreError::RevisionMismatch {
                    expected: expected_revision,
                    actual,
                });
            }
            Ok(inner.write(&key, value))
        })
    }

    fn put(&self, key: &str, value: Vec<u8>) -> BoxFuture<'_, u64> {
        let key = key.to_string();
        Box::pin(async move { Ok(self.inner.lock().await.write(&key, value)) })
    }
}
