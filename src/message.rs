// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Message decoding for the newline-delimited input channel.
//!
//! Each input line is one JSON object whose `type` field selects the variant:
//!
//! ```text
//! {"type": "SCHEMA", "stream": "users", "schema": {...}, "key_properties": ["id"], "bookmark_properties": ["updated_at"]}
//! {"type": "RECORD", "stream": "users", "record": {...}, "time_extracted": "2024-01-01T00:00:00Z"}
//! {"type": "STATE", "value": {...}}
//! {"type": "ACTIVATE_VERSION", "stream": "users", "version": 3}
//! ```
//!
//! A line that is not valid JSON, has no `type`, or has a known `type` with
//! the wrong shape is fatal. A well-formed object with an unrecognized `type`
//! decodes to [`Message::Unknown`] so the caller can log and skip it.

use crate::error::{ReplicationError, Result};
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, Lines};

/// Defines (or redefines) a stream.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SchemaMessage {
    pub stream: String,
    pub schema: Value,
    #[serde(default)]
    pub key_properties: Vec<String>,
    #[serde(default)]
    pub bookmark_properties: Option<Vec<String>>,
}

/// One data record for a stream.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RecordMessage {
    pub stream: String,
    pub record: Map<String, Value>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub time_extracted: Option<DateTime<FixedOffset>>,
}

/// Timestamp layouts accepted without an offset; those are taken as UTC.
const NAIVE_TIMESTAMP_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Parse an RFC 3339 timestamp, tolerating a space separator, a missing
/// offset (UTC) or a bare date (midnight UTC).
pub fn parse_timestamp(raw: &str) -> Option<DateTime<FixedOffset>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts);
    }
    if let Ok(ts) = DateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f%:z") {
        return Some(ts);
    }
    let naive = NAIVE_TIMESTAMP_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })?;
    Some(naive.and_utc().fixed_offset())
}

fn lenient_timestamp<'de, D>(deserializer: D) -> std::result::Result<Option<DateTime<FixedOffset>>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        None => Ok(None),
        Some(raw) => parse_timestamp(&raw)
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp {:?}", raw))),
    }
}

/// Opaque checkpoint supplied by the producer.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StateMessage {
    pub value: Value,
}

/// Version activation for a stream. Not supported by this target.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ActivateVersionMessage {
    pub stream: String,
    pub version: u64,
}

/// A decoded input message.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Schema(SchemaMessage),
    Record(RecordMessage),
    State(StateMessage),
    ActivateVersion(ActivateVersionMessage),
    /// Well-formed message with a `type` we do not handle.
    Unknown { kind: String },
}

impl Message {
    /// Short name of the variant, used for logging and metrics.
    pub fn kind(&self) -> &str {
        match self {
            Message::Schema(_) => "schema",
            Message::Record(_) => "record",
            Message::State(_) => "state",
            Message::ActivateVersion(_) => "activate_version",
            Message::Unknown { .. } => "unknown",
        }
    }
}

/// Decode a single input line.
pub fn parse_message(line: &str) -> Result<Message> {
    let parse_err = |message: String| ReplicationError::MessageParse {
        line: line.to_string(),
        message,
    };

    let mut value: Value = serde_json::from_str(line).map_err(|e| parse_err(e.to_string()))?;
    let kind = match value.get("type") {
        Some(Value::String(kind)) => kind.clone(),
        Some(_) => return Err(parse_err("field `type` is not a string".into())),
        None => return Err(parse_err("missing field `type`".into())),
    };

    // The tag is not part of any variant struct.
    if let Some(obj) = value.as_object_mut() {
        obj.remove("type");
    }

    let message = match kind.as_str() {
        "SCHEMA" => Message::Schema(decode(value).map_err(parse_err)?),
        "RECORD" => Message::Record(decode(value).map_err(parse_err)?),
        "STATE" => Message::State(decode(value).map_err(parse_err)?),
        "ACTIVATE_VERSION" => Message::ActivateVersion(decode(value).map_err(parse_err)?),
        _ => Message::Unknown { kind },
    };
    Ok(message)
}

fn decode<T: serde::de::DeserializeOwned>(value: Value) -> std::result::Result<T, String> {
    serde_json::from_value(value).map_err(|e| e.to_string())
}

/// Reads messages line by line from an async input channel.
///
/// The sequence is lazy and can only be consumed once, front to back.
pub struct MessageReader<R> {
    lines: Lines<R>,
    line_number: u64,
}

impl<R: AsyncBufRead + Unpin> MessageReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            line_number: 0,
        }
    }

    /// Number of lines consumed so far (including blank ones).
    pub fn line_number(&self) -> u64 {
        self.line_number
    }

    /// Read and decode the next message.
    ///
    /// Returns `Ok(None)` once the channel is closed. Blank lines are skipped.
    pub async fn next_message(&mut self) -> Result<Option<Message>> {
        while let Some(line) = self.lines.next_line().await? {
            self.line_number += 1;
            if line.trim().is_empty() {
                continue;
            }
            return parse_message(&line).map(Some);
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_schema() {
        let msg = parse_message(
            r#"{"type":"SCHEMA","stream":"users","schema":{"type":"object"},"key_properties":["id"],"bookmark_properties":["updated_at"]}"#,
        )
        .unwrap();
        match msg {
            Message::Schema(s) => {
                assert_eq!(s.stream, "users");
                assert_eq!(s.schema, json!({"type": "object"}));
                assert_eq!(s.key_properties, vec!["id"]);
                assert_eq!(s.bookmark_properties, Some(vec!["updated_at".to_string()]));
            }
            other => panic!("expected schema, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_schema_without_optional_lists() {
        let msg = parse_message(r#"{"type":"SCHEMA","stream":"s","schema":{}}"#).unwrap();
        match msg {
            Message::Schema(s) => {
                assert!(s.key_properties.is_empty());
                assert!(s.bookmark_properties.is_none());
            }
            other => panic!("expected schema, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_record_with_time_extracted() {
        let msg = parse_message(
            r#"{"type":"RECORD","stream":"users","record":{"id":"1"},"time_extracted":"2024-03-01T12:00:00+00:00"}"#,
        )
        .unwrap();
        match msg {
            Message::Record(r) => {
                assert_eq!(r.stream, "users");
                assert_eq!(r.record.get("id"), Some(&json!("1")));
                let ts = r.time_extracted.unwrap();
                assert_eq!(ts.to_rfc3339(), "2024-03-01T12:00:00+00:00");
            }
            other => panic!("expected record, got {:?}", other),
        }
    }

    #[test]
    fn test_naive_time_extracted_is_utc() {
        let msg = parse_message(
            r#"{"type":"RECORD","stream":"s","record":{},"time_extracted":"2024-01-01T00:00:00"}"#,
        )
        .unwrap();
        let Message::Record(r) = msg else {
            panic!("expected record");
        };
        assert_eq!(r.time_extracted.unwrap().to_rfc3339(), "2024-01-01T00:00:00+00:00");
    }

    #[test]
    fn test_parse_timestamp_layouts() {
        let expect = |raw: &str, rfc: &str| {
            assert_eq!(parse_timestamp(raw).map(|ts| ts.to_rfc3339()).as_deref(), Some(rfc), "{}", raw);
        };
        expect("2024-01-01 10:00:00", "2024-01-01T10:00:00+00:00");
        expect("2024-01-01T10:00:00.250", "2024-01-01T10:00:00.250+00:00");
        expect("2024-01-01 10:00:00+02:00", "2024-01-01T10:00:00+02:00");
        expect("2024-01-01", "2024-01-01T00:00:00+00:00");
        assert_eq!(parse_timestamp("yesterday"), None);
    }

    #[test]
    fn test_null_time_extracted() {
        let msg = parse_message(r#"{"type":"RECORD","stream":"s","record":{},"time_extracted":null}"#).unwrap();
        assert!(matches!(msg, Message::Record(RecordMessage { time_extracted: None, .. })));
    }

    #[test]
    fn test_parse_state() {
        let msg = parse_message(r#"{"type":"STATE","value":{"x":1}}"#).unwrap();
        assert_eq!(
            msg,
            Message::State(StateMessage {
                value: json!({"x": 1})
            })
        );
    }

    #[test]
    fn test_parse_activate_version() {
        let msg = parse_message(r#"{"type":"ACTIVATE_VERSION","stream":"s","version":7}"#).unwrap();
        assert_eq!(msg.kind(), "activate_version");
    }

    #[test]
    fn test_unknown_type_is_not_fatal() {
        let msg = parse_message(r#"{"type":"BATCH","stream":"s"}"#).unwrap();
        assert_eq!(
            msg,
            Message::Unknown {
                kind: "BATCH".to_string()
            }
        );
    }

    #[test]
    fn test_invalid_json_is_fatal_and_keeps_line() {
        let err = parse_message("{\"type\": \"RECORD\"").unwrap_err();
        match err {
            ReplicationError::MessageParse { line, .. } => assert_eq!(line, "{\"type\": \"RECORD\""),
            other => panic!("expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_type_is_fatal() {
        assert!(parse_message(r#"{"stream":"s"}"#).is_err());
        assert!(parse_message(r#"{"type":5}"#).is_err());
    }

    #[test]
    fn test_record_with_wrong_shape_is_fatal() {
        assert!(parse_message(r#"{"type":"RECORD","stream":"s","record":[1,2]}"#).is_err());
        assert!(parse_message(r#"{"type":"RECORD","stream":"s","record":{},"time_extracted":"yesterday"}"#).is_err());
    }

    #[tokio::test]
    async fn test_reader_skips_blank_lines() {
        let input = "{\"type\":\"STATE\",\"value\":1}\n\n   \n{\"type\":\"STATE\",\"value\":2}\n";
        let mut reader = MessageReader::new(input.as_bytes());

        let first = reader.next_message().await.unwrap().unwrap();
        assert_eq!(first, Message::State(StateMessage { value: json!(1) }));
        let second = reader.next_message().await.unwrap().unwrap();
        assert_eq!(second, Message::State(StateMessage { value: json!(2) }));
        assert!(reader.next_message().await.unwrap().is_none());
        assert_eq!(reader.line_number(), 4);
    }

    #[tokio::test]
    async fn test_reader_surfaces_parse_error() {
        let input = "{\"type\":\"STATE\",\"value\":1}\nnot json\n";
        let mut reader = MessageReader::new(input.as_bytes());
        assert!(reader.next_message().await.unwrap().is_some());
        assert!(reader.next_message().await.is_err());
    }
}
