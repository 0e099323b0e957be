// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Provenance fields added to records before they are persisted.

use chrono::{DateTime, FixedOffset, SecondsFormat, Utc};
use serde_json::{Map, Value};

/// When the producer extracted the record.
pub const EXTRACTED_AT: &str = "_sdc_extracted_at";
/// When this target received the record.
pub const RECEIVED_AT: &str = "_sdc_received_at";
/// Set on stored values that represent a deleted entity.
pub const DELETED_AT: &str = "_sdc_deleted_at";

/// Add `_sdc_extracted_at` (if supplied and absent) and `_sdc_received_at`
/// (if absent). Existing values are never overwritten.
pub fn enrich(
    record: &mut Map<String, Value>,
    time_extracted: Option<&DateTime<FixedOffset>>,
    received_at: DateTime<Utc>,
) {
    if let Some(extracted) = time_extracted {
        if !record.contains_key(EXTRACTED_AT) {
            record.insert(
                EXTRACTED_AT.to_string(),
                Value::String(extracted.to_rfc3339_opts(SecondsFormat::AutoSi, false)),
            );
        }
    }
    if !record.contains_key(RECEIVED_AT) {
        record.insert(
            RECEIVED_AT.to_string(),
            Value::String(received_at.to_rfc3339_opts(SecondsFormat::AutoSi, false)),
        );
    }
}

/// True if a stored value carries a non-null deletion marker.
pub fn is_tombstone(record: &Value) -> bool {
    record.get(DELETED_AT).is_some_and(|v| !v.is_null())
}
