// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! The replication loop.
//!
//! Messages are handled strictly one at a time, in input order. The only
//! suspension points are store calls; no other message is read while one is
//! in flight. This ordering is what makes the freshness comparison and the
//! revision fencing in [`resolver`](crate::resolver) meaningful.
//!
//! ```text
//! MessageReader ──► ReplicationTarget::handle_message
//!                     ├── SCHEMA           → StreamRegistry::register_schema
//!                     ├── RECORD           → build_key → validate → enrich → ConflictResolver
//!                     ├── STATE            → StateTracker::observe
//!                     └── ACTIVATE_VERSION / unknown → log, ignore
//! end of input ──► StateTracker::drain ──► RunSummary.state
//! ```
//!
//! # Failure Model
//!
//! Per-record problems (unknown stream, bad key, schema violation) and
//! resolver skips are counted and logged; the run continues. Anything that
//! returns `Err` (bad input line, invalid schema, store failure or conflict)
//! aborts the run, and no checkpoint is produced.

use crate::config::TargetConfig;
use crate::error::Result;
use crate::key::{build_key, KeyRejection};
use crate::message::{Message, MessageReader, RecordMessage};
use crate::metrics;
use crate::record::enrich;
use crate::registry::{SchemaViolation, StreamRegistry};
use crate::resolver::{ConflictResolver, Outcome};
use crate::state::StateTracker;
use crate::store::KvStore;
use chrono::Utc;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncWrite, AsyncWriteExt};
use tracing::{debug, info, info_span, warn, Instrument};

/// Why a record was dropped before reaching the resolver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordRejection {
    /// No schema message has been seen for the stream.
    UnknownStream,
    Key(KeyRejection),
    Schema(SchemaViolation),
}

impl RecordRejection {
    /// Stable label for metrics.
    pub fn reason(&self) -> &'static str {
        match self {
            RecordRejection::UnknownStream => "unknown_stream",
            RecordRejection::Key(k) => k.reason(),
            RecordRejection::Schema(_) => "schema_violation",
        }
    }
}

impl fmt::Display for RecordRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordRejection::UnknownStream => write!(f, "no schema registered for stream"),
            RecordRejection::Key(k) => write!(f, "{}", k),
            RecordRejection::Schema(v) => write!(f, "fails schema validation: {}", v),
        }
    }
}

/// What happened to one record message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordDisposition {
    Rejected(RecordRejection),
    Resolved(Outcome),
}

impl RecordDisposition {
    pub fn wrote(&self) -> bool {
        matches!(self, RecordDisposition::Resolved(outcome) if outcome.wrote())
    }
}

/// Counters for a completed run plus the checkpoint to emit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    pub messages: u64,
    pub schemas: u64,
    pub records: u64,
    pub created: u64,
    pub updated: u64,
    pub overwritten: u64,
    pub skipped: u64,
    pub rejected: u64,
    pub ignored: u64,
    /// Last checkpoint not cleared by a record, if any.
    pub state: Option<Value>,
}

impl RunSummary {
    fn count(&mut self, disposition: &RecordDisposition) {
        self.records += 1;
        match disposition {
            RecordDisposition::Rejected(_) => self.rejected += 1,
            RecordDisposition::Resolved(Outcome::Created { .. }) => self.created += 1,
            RecordDisposition::Resolved(Outcome::Updated { .. }) => self.updated += 1,
            RecordDisposition::Resolved(Outcome::Overwritten { .. }) => self.overwritten += 1,
            RecordDisposition::Resolved(Outcome::Skipped(_)) => self.skipped += 1,
        }
    }
}

/// Drives decoded messages into the registry, resolver and state tracker.
pub struct ReplicationTarget<S: KvStore> {
    store: Arc<S>,
    key_prefix: String,
    registry: StreamRegistry,
    resolver: ConflictResolver,
    state: StateTracker,
    summary: RunSummary,
}

impl<S: KvStore> ReplicationTarget<S> {
    /// Create a target writing to `store` with the config's key prefix,
    /// freshness order and state clear policy.
    pub fn new(store: Arc<S>, config: &TargetConfig) -> Self {
        Self {
            store,
            key_prefix: config.key_prefix.clone(),
            registry: StreamRegistry::new(),
            resolver: ConflictResolver::new(config.freshness_order.comparator()),
            state: StateTracker::new(config.state_clear_policy),
            summary: RunSummary::default(),
        }
    }

    /// Replace the resolver (e.g. to plug in a custom freshness comparator).
    pub fn with_resolver(mut self, resolver: ConflictResolver) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn registry(&self) -> &StreamRegistry {
        &self.registry
    }

    pub fn summary(&self) -> &RunSummary {
        &self.summary
    }

    /// Consume every message from `reader`, then return the summary with
    /// the drained checkpoint.
    pub async fn run<R: AsyncBufRead + Unpin>(mut self, reader: R) -> Result<RunSummary> {
        let span = info_span!("replication", prefix = %self.key_prefix);
        async move {
            let mut messages = MessageReader::new(reader);
            while let Some(message) = messages.next_message().await? {
                self.handle_message(message).await?;
            }
            let summary = self.finish();
            info!(
                lines = messages.line_number(),
                records = summary.records,
                created = summary.created,
                updated = summary.updated,
                overwritten = summary.overwritten,
                skipped = summary.skipped,
                rejected = summary.rejected,
                "Input exhausted"
            );
            Ok(summary)
        }
        .instrument(span)
        .await
    }

    /// Drain the state tracker and return the final summary.
    pub fn finish(self) -> RunSummary {
        let mut summary = self.summary;
        summary.state = self.state.drain();
        summary
    }

    /// Handle one decoded message.
    pub async fn handle_message(&mut self, message: Message) -> Result<()> {
        self.summary.messages += 1;
        metrics::record_message(message.kind());

        match message {
            Message::Schema(schema) => {
                self.registry.register_schema(
                    &schema.stream,
                    schema.schema,
                    schema.key_properties,
                    schema.bookmark_properties,
                )?;
                self.summary.schemas += 1;
            }
            Message::Record(record) => {
                let disposition = self.handle_record(record).await?;
                self.state.record_processed(disposition.wrote());
                self.summary.count(&disposition);
            }
            Message::State(state) => self.state.observe(state.value),
            Message::ActivateVersion(activate) => {
                warn!(
                    stream = %activate.stream,
                    version = activate.version,
                    "ACTIVATE_VERSION is unsupported"
                );
                self.summary.ignored += 1;
            }
            Message::Unknown { kind } => {
                warn!(kind = %kind, "Unknown message type");
                self.summary.ignored += 1;
            }
        }
        Ok(())
    }

    /// Key, validate, enrich and resolve one record.
    pub async fn handle_record(&self, message: RecordMessage) -> Result<RecordDisposition> {
        let RecordMessage {
            stream,
            record,
            time_extracted,
        } = message;

        let Some(info) = self.registry.lookup(&stream) else {
            return Ok(reject(&stream, RecordRejection::UnknownStream));
        };

        let (key, record) = match build_key(&self.key_prefix, &stream, info, &record) {
            Ok((key, _)) => (key, Value::Object(record)),
            Err(rejection) => return Ok(reject(&stream, RecordRejection::Key(rejection))),
        };
        if let Err(violation) = info.validate(&record) {
            return Ok(reject(&stream, RecordRejection::Schema(violation)));
        }

        let mut record = record;
        if let Value::Object(fields) = &mut record {
            enrich(fields, time_extracted.as_ref(), Utc::now());
        }

        let outcome = self
            .resolver
            .resolve(self.store.as_ref(), &stream, info, &key, &record)
            .await?;
        metrics::record_outcome(&stream, outcome.label());
        debug!(stream = %stream, key = %key, outcome = outcome.label(), "Resolved record");
        Ok(RecordDisposition::Resolved(outcome))
    }
}

fn reject(stream: &str, rejection: RecordRejection) -> RecordDisposition {
    warn!(stream = %stream, reason = %rejection, "Ignoring record");
    metrics::record_rejection(stream, rejection.reason());
    RecordDisposition::Rejected(rejection)
}

/// Write the final checkpoint as one JSON line and flush.
///
/// Returns whether anything was written.
pub async fn emit_state<W: AsyncWrite + Unpin>(out: &mut W, state: Option<&Value>) -> Result<bool> {
    let Some(state) = state else {
        return Ok(false);
    };
    let mut line = state.to_string();
    debug!(state = %line, "Emitting state");
    line.push('\n');
    out.write_all(line.as_bytes()).await?;
    out.flush().await?;
    metrics::record_state_emitted();
    Ok(true)
}
