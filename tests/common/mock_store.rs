//! Mock KvStore for testing.
//!
//! Wraps [`MemoryKvStore`] and records every call for assertions.
//! Can inject backend failures and simulate a concurrent writer that
//! sneaks in between our read and our conditional write.

use replication_target::store::{BoxFuture, KvStore, MemoryKvStore, StoreEntry, StoreError};
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::RwLock;

/// A recorded store call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCall {
    Get(String),
    Create(String),
    Update { key: String, expected: u64 },
    Put(String),
}

impl StoreCall {
    #[allow(dead_code)]
    pub fn is_write(&self) -> bool {
        !matches!(self, StoreCall::Get(_))
    }
}

/// Mock implementation of KvStore that records all calls.
///
/// # Example
/// ```rust,ignore
/// let mock = MockKvStore::new();
/// mock.fail_after(3);
///
/// // Use in tests...
///
/// let calls = mock.calls().await;
/// assert_eq!(calls.len(), 4);
/// ```
pub struct MockKvStore {
    inner: MemoryKvStore,
    calls: RwLock<Vec<StoreCall>>,
    /// Fail with a backend error once this many calls have been made
    fail_after_calls: AtomicUsize,
    call_count: AtomicUsize,
    /// Value another writer puts right before our next create/update
    interference: RwLock<Option<Vec<u8>>>,
}

impl MockKvStore {
    pub fn new() -> Self {
        Self {
            inner: MemoryKvStore::new(),
            calls: RwLock::new(Vec::new()),
            fail_after_calls: AtomicUsize::new(usize::MAX),
            call_count: AtomicUsize::new(0),
            interference: RwLock::new(None),
        }
    }

    /// Configure every call after the first `n` to fail with a backend error.
    #[allow(dead_code)]
    pub fn fail_after(&self, n: usize) {
        self.fail_after_calls.store(n, Ordering::SeqCst);
    }

    /// Make another writer store `value` right before our next create/update.
    #[allow(dead_code)]
    pub async fn interfere_once(&self, value: &[u8]) {
        *self.interference.write().await = Some(value.to_vec());
    }

    /// Seed an entry without recording a call.
    #[allow(dead_code)]
    pub async fn seed(&self, key: &str, value: &[u8]) -> u64 {
        self.inner.put(key, value.to_vec()).await.unwrap()
    }

    /// Get all recorded calls.
    pub async fn calls(&self) -> Vec<StoreCall> {
        self.calls.read().await.clone()
    }

    /// Get all recorded write calls.
    #[allow(dead_code)]
    pub async fn writes(&self) -> Vec<StoreCall> {
        self.calls().await.into_iter().filter(StoreCall::is_write).collect()
    }

    /// Current stored value decoded as JSON.
    #[allow(dead_code)]
    pub async fn stored_json(&self, key: &str) -> Option<serde_json::Value> {
        let entry = self.inner.get(key).await.unwrap()?;
        Some(serde_json::from_slice(&entry.value).unwrap())
    }

    #[allow(dead_code)]
    pub async fn len(&self) -> usize {
        self.inner.len().await
    }

    async fn record(&self, call: StoreCall) -> Result<(), StoreError> {
        self.calls.write().await.push(call);
        let count = self.call_count.fetch_add(1, Ordering::SeqCst);
        if count >= self.fail_after_calls.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("Simulated failure".to_string()));
        }
        Ok(())
    }

    async fn interfere(&self, key: &str) {
        if let Some(value) = self.interference.write().await.take() {
            self.inner.put(key, value).await.unwrap();
        }
    }
}

impl Default for MockKvStore {
    fn default() -> Self {
        Self::new()
    }
}

impl KvStore for MockKvStore {
    fn get(&self, key: &str) -> BoxFuture<'_, Option<StoreEntry>> {
        let key = key.to_string();
        Box::pin(async move {
            self.record(StoreCall::Get(key.clone())).await?;
            self.inner.get(&key).await
        })
    }

    fn create(&self, key: &str, value: Vec<u8>) -> BoxFuture<'_, u64> {
        let key = key.to_string();
        Box::pin(async move {
            self.record(StoreCall::Create(key.clone())).await?;
            self.interfere(&key).await;
            self.inner.create(&key, value).await
        })
    }

    fn update(&self, key: &str, value: Vec<u8>, expected_revision: u64) -> BoxFuture<'_, u64> {
        let key = key.to_string();
        Box::pin(async move {
            self.record(StoreCall::Update {
                key: key.clone(),
                expected: expected_revision,
            })
            .await?;
            self.interfere(&key).await;
            self.inner.update(&key, value, expected_revision).await
        })
    }

    fn put(&self, key: &str, value: Vec<u8>) -> BoxFuture<'_, u64> {
        let key = key.to_string();
        Box::pin(async move {
            self.record(StoreCall::Put(key.clone())).await?;
            self.inner.put(&key, value).await
        })
    }
}
