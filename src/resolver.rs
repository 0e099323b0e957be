// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Conflict resolution: decide how (and whether) a record reaches the store.
//!
//! # Decision Table
//!
//! ```text
//! freshness property?  existing entry        freshness check   operation        outcome
//! -------------------  --------------------  ----------------  ---------------  -----------
//! no                   (not read)            -                 PUT              Overwritten
//! yes                  absent                -                 CREATE           Created
//! yes                  empty value           -                 -                Skipped(EmptyExisting)
//! yes                  tombstoned            -                 -                Skipped(TargetDeleted)
//! yes                  present @ rev R       source > target   UPDATE(R)        Updated
//! yes                  present @ rev R       source <= target  -                Skipped(NotNewer)
//! ```
//!
//! Freshness values are stringified (see [`stringify`]) and compared with the
//! configured [`FreshnessComparator`]; a missing field compares as `""`.
//!
//! # Concurrency
//!
//! CREATE and UPDATE are fenced by the store. If another writer got there
//! first, the store rejects the write and the error ends the run. It is not
//! retried here: a retry would re-read, re-compare, and might legitimately
//! skip, but the decision of whether to rerun belongs to the operator.

use crate::error::{ReplicationError, Result};
use crate::freshness::{FreshnessComparator, Lexicographic};
use crate::key::stringify;
use crate::metrics;
use crate::record::is_tombstone;
use crate::registry::StreamInfo;
use crate::store::{KvStore, StoreResult};
use serde_json::Value;
use std::future::Future;
use std::time::Instant;
use tracing::{debug, trace, warn};

/// Why a valid record was not written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The existing entry has no value.
    EmptyExisting,
    /// The existing entry is a tombstone.
    TargetDeleted,
    /// The existing entry is at least as fresh.
    NotNewer,
}

/// What happened to a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// New entry created (key was absent).
    Created { revision: u64 },
    /// Existing entry replaced under revision fencing.
    Updated { revision: u64 },
    /// Unconditional write (stream has no freshness property).
    Overwritten { revision: u64 },
    Skipped(SkipReason),
}

impl Outcome {
    /// True if the record was durably written.
    pub fn wrote(&self) -> bool {
        !matches!(self, Outcome::Skipped(_))
    }

    /// Stable label for metrics and logs.
    pub fn label(&self) -> &'static str {
        match self {
            Outcome::Created { .. } => "created",
            Outcome::Updated { .. } => "updated",
            Outcome::Overwritten { .. } => "overwritten",
            Outcome::Skipped(SkipReason::EmptyExisting) => "skipped_empty_existing",
            Outcome::Skipped(SkipReason::TargetDeleted) => "skipped_target_deleted",
            Outcome::Skipped(SkipReason::NotNewer) => "skipped_not_newer",
        }
    }
}

/// Applies records to the store with last-writer-wins by freshness.
pub struct ConflictResolver {
    comparator: Box<dyn FreshnessComparator>,
}

impl Default for ConflictResolver {
    fn default() -> Self {
        Self::new(Box::new(Lexicographic))
    }
}

impl ConflictResolver {
    pub fn new(comparator: Box<dyn FreshnessComparator>) -> Self {
        Self { comparator }
    }

    /// Resolve and apply one validated, keyed record.
    ///
    /// `record` must be the enriched record; it is serialized as-is.
    pub async fn resolve<S: KvStore + ?Sized>(
        &self,
        store: &S,
        stream: &str,
        info: &StreamInfo,
        key: &str,
        record: &Value,
    ) -> Result<Outcome> {
        let payload = serde_json::to_vec(record)
            .map_err(|e| ReplicationError::Internal(format!("cannot serialize record: {}", e)))?;

        let Some(freshness_field) = info.freshness_property() else {
            let revision = timed("put", key, store.put(key, payload)).await?;
            trace!(stream = %stream, key = %key, revision, "Put record");
            return Ok(Outcome::Overwritten { revision });
        };

        let source_freshness = record
            .get(freshness_field)
            .map(stringify)
            .unwrap_or_default();

        let existing = match timed("get", key, store.get(key)).await? {
            None => {
                let revision = timed("create", key, store.create(key, payload)).await?;
                trace!(stream = %stream, key = %key, revision, "Created record");
                return Ok(Outcome::Created { revision });
            }
            Some(entry) => entry,
        };

        if existing.value.is_empty() {
            warn!(stream = %stream, key = %key, "Unexpected empty existing value");
            return Ok(Outcome::Skipped(SkipReason::EmptyExisting));
        }

        let current: Value =
            serde_json::from_slice(&existing.value).map_err(|e| ReplicationError::CorruptEntry {
                key: key.to_string(),
                message: e.to_string(),
            })?;

        if is_tombstone(&current) {
            warn!(stream = %stream, key = %key, "Skipping record due to target having been deleted");
            return Ok(Outcome::Skipped(SkipReason::TargetDeleted));
        }

        let target_freshness = current
            .get(freshness_field)
            .map(stringify)
            .unwrap_or_default();

        if !self.comparator.is_newer(&source_freshness, &target_freshness) {
            debug!(
                stream = %stream,
                key = %key,
                source = %source_freshness,
                target = %target_freshness,
                "Skipping record due to not being newer"
            );
            return Ok(Outcome::Skipped(SkipReason::NotNewer));
        }

        let revision = timed(
            "update",
            key,
            store.update(key, payload, existing.revision),
        )
        .await?;
        trace!(
            stream = %stream,
            key = %key,
            previous = existing.revision,
            revision,
            "Updated record"
        );
        Ok(Outcome::Updated { revision })
    }
}

/// Run a store call, recording latency and wrapping failures.
async fn timed<T>(
    operation: &'static str,
    key: &str,
    call: impl Future<Output = StoreResult<T>>,
) -> Result<T> {
    let start = Instant::now();
    let result = call.await;
    metrics::record_store_latency(operation, start.elapsed());
    result.map_err(|e| {
        metrics::record_store_error(operation, e.is_conflict());
        ReplicationError::store(operation, key, e)
    })
}
