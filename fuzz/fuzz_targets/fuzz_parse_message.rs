//! Fuzz target for protocol line parsing.
//!
//! Arbitrary input must produce either a message or a parse error that
//! carries the offending line. Never a panic.

#![no_main]

use libfuzzer_sys::fuzz_target;
use replication_target::{parse_message, ReplicationError};

fuzz_target!(|line: &str| {
    match parse_message(line) {
        Ok(message) => {
            // Every parsed message reports a non-empty kind
            assert!(!message.kind().is_empty());
        }
        Err(ReplicationError::MessageParse { line: echoed, .. }) => {
            assert_eq!(echoed, line);
        }
        Err(other) => panic!("unexpected error kind: {:?}", other),
    }
});
