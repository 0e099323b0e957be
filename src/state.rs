// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Tracks the checkpoint to hand back at the end of a run.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

/// Which records clear a pending checkpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateClearPolicy {
    /// Only a record that was actually written to the store.
    #[default]
    DurableWrite,
    /// Every record message, including rejected and skipped ones.
    EveryRecord,
}

/// Holds the most recent checkpoint not yet superseded by a record.
#[derive(Debug, Default)]
pub struct StateTracker {
    policy: StateClearPolicy,
    pending: Option<Value>,
}

impl StateTracker {
    pub fn new(policy: StateClearPolicy) -> Self {
        Self {
            policy,
            pending: None,
        }
    }

    pub fn policy(&self) -> StateClearPolicy {
        self.policy
    }

    /// Replace the pending checkpoint. A `null` value means no checkpoint.
    pub fn observe(&mut self, checkpoint: Value) {
        debug!(state = %checkpoint, "Setting state");
        self.pending = match checkpoint {
            Value::Null => None,
            checkpoint => Some(checkpoint),
        };
    }

    /// Drop the pending checkpoint.
    pub fn clear(&mut self) {
        self.pending = None;
    }

    /// Apply the clear policy after a record message was handled.
    ///
    /// `wrote` is true when the record produced a durable store write.
    pub fn record_processed(&mut self, wrote: bool) {
        match self.policy {
            StateClearPolicy::DurableWrite if wrote => self.clear(),
            StateClearPolicy::DurableWrite => {}
            StateClearPolicy::EveryRecord => self.clear(),
        }
    }

    pub fn pending(&self) -> Option<&Value> {
        self.pending.as_ref()
    }

    /// Take the pending checkpoint at the end of the run.
    pub fn drain(self) -> Option<Value> {
        self.pending
    }
}
