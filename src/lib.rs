//! # Replication Target
//!
//! Replicates schema-validated records from a newline-delimited message
//! stream into a versioned key-value store, without ever letting an older
//! record overwrite a newer one.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────────┐
//! │                          replication-target                              │
//! │                                                                          │
//! │  ┌───────────────┐    ┌───────────────────┐    ┌──────────────────────┐  │
//! │  │ MessageReader │───►│ ReplicationTarget │───►│ ConflictResolver     │  │
//! │  │ (stdin lines) │    │ (dispatch loop)   │    │ (get/create/update)  │  │
//! │  └───────────────┘    └───────────────────┘    └──────────────────────┘  │
//! │                          │            │                   │              │
//! │                          ▼            ▼                   ▼              │
//! │                 ┌────────────────┐ ┌──────────────┐ ┌─────────────────┐  │
//! │                 │ StreamRegistry │ │ StateTracker │ │ KvStore (Redis) │  │
//! │                 │ + build_key    │ │ (checkpoint) │ │ revision fenced │  │
//! │                 └────────────────┘ └──────────────┘ └─────────────────┘  │
//! └──────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Conflict Resolution
//!
//! Streams with a bookmark property get last-writer-wins by freshness:
//! a record only replaces the stored one if its bookmark value is newer,
//! and the replacement is fenced on the revision that was read. Streams
//! without one are written unconditionally.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use replication_target::{MemoryKvStore, ReplicationTarget, TargetConfig};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> replication_target::Result<()> {
//!     let config = TargetConfig::default();
//!     let store = Arc::new(MemoryKvStore::new());
//!     let input = tokio::io::BufReader::new(tokio::io::stdin());
//!
//!     let summary = ReplicationTarget::new(store, &config).run(input).await?;
//!     println!("{:?}", summary.state);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod freshness;
pub mod key;
pub mod message;
pub mod metrics;
pub mod record;
pub mod redis_store;
pub mod registry;
pub mod resolver;
pub mod state;
pub mod store;

// Re-exports for convenience
pub use config::TargetConfig;
pub use engine::{emit_state, RecordDisposition, RecordRejection, ReplicationTarget, RunSummary};
pub use error::{ReplicationError, Result};
pub use freshness::{FreshnessComparator, FreshnessOrder, Lexicographic, Numeric};
pub use key::{build_key, KeyRejection};
pub use message::{parse_message, Message, MessageReader};
pub use redis_store::RedisKvStore;
pub use registry::{StreamInfo, StreamRegistry};
pub use resolver::{ConflictResolver, Outcome, SkipReason};
pub use state::{StateClearPolicy, StateTracker};
pub use store::{KvStore, MemoryKvStore, StoreEntry, StoreError};
