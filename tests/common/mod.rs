//! Shared test utilities for integration and chaos tests.
//!
//! This module provides:
//! - Redis testcontainer setup
//! - Mock KvStore for recording calls and injecting failures
//! - Message line builders

#![allow(dead_code)]

pub mod containers;
pub mod mock_store;

pub use containers::*;
pub use mock_store::*;

use serde_json::{json, Value};

/// A SCHEMA line with a single key property and optional bookmark.
pub fn schema_line(stream: &str, key: &str, bookmark: Option<&str>) -> String {
    let bookmarks: Vec<&str> = bookmark.into_iter().collect();
    json!({
        "type": "SCHEMA",
        "stream": stream,
        "schema": {"type": "object"},
        "key_properties": [key],
        "bookmark_properties": bookmarks,
    })
    .to_string()
}

/// A SCHEMA line with an explicit schema document.
pub fn schema_line_with(stream: &str, schema: Value, key: &str, bookmark: Option<&str>) -> String {
    let bookmarks: Vec<&str> = bookmark.into_iter().collect();
    json!({
        "type": "SCHEMA",
        "stream": stream,
        "schema": schema,
        "key_properties": [key],
        "bookmark_properties": bookmarks,
    })
    .to_string()
}

pub fn record_line(stream: &str, record: Value) -> String {
    json!({"type": "RECORD", "stream": stream, "record": record}).to_string()
}

pub fn state_line(value: Value) -> String {
    json!({"type": "STATE", "value": value}).to_string()
}

/// Join lines into newline-delimited input.
pub fn input(lines: &[String]) -> Vec<u8> {
    let mut out = lines.join("\n");
    out.push('\n');
    out.into_bytes()
}
