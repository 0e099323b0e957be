// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Metrics for observability.
//!
//! Emitted through the `metrics` facade; nothing is recorded unless the
//! embedding process installs a recorder.
//!
//! # Metric Naming Convention
//!
//! All metrics are prefixed with `replication_target_` and follow Prometheus
//! conventions:
//! - Counters end in `_total`
//! - Histograms track distributions (duration)

use metrics::{counter, histogram};
use std::time::Duration;

/// Record one decoded input message by kind.
pub fn record_message(kind: &str) {
    counter!("replication_target_messages_total", "kind" => kind.to_string()).increment(1);
}

/// Record the outcome of resolving one record.
pub fn record_outcome(stream: &str, outcome: &str) {
    counter!(
        "replication_target_record_outcomes_total",
        "stream" => stream.to_string(),
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

/// Record a record rejected before reaching the store.
pub fn record_rejection(stream: &str, reason: &str) {
    counter!(
        "replication_target_records_rejected_total",
        "stream" => stream.to_string(),
        "reason" => reason.to_string()
    )
    .increment(1);
}

/// Record store operation latency.
pub fn record_store_latency(operation: &str, duration: Duration) {
    histogram!("replication_target_store_operation_duration_seconds", "operation" => operation.to_string())
        .record(duration.as_secs_f64());
}

/// Record a failed store operation.
pub fn record_store_error(operation: &str, conflict: bool) {
    let kind = if conflict { "conflict" } else { "backend" };
    counter!(
        "replication_target_store_errors_total",
        "operation" => operation.to_string(),
        "kind" => kind
    )
    .increment(1);
}

/// Record a checkpoint emitted at the end of a run.
pub fn record_state_emitted() {
    counter!("replication_target_states_emitted_total").increment(1);
}
