// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Ordering of freshness (bookmark) values.
//!
//! The resolver only asks one question: is the incoming value strictly newer
//! than the stored one? Both sides arrive already stringified.
//!
//! [`Lexicographic`] is the default and is correct for fixed-format values
//! such as ISO-8601 timestamps. [`Numeric`] handles counters and epoch values
//! that are not zero-padded.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Strategy deciding whether a source freshness value supersedes a target.
pub trait FreshnessComparator: Send + Sync {
    /// Order `source` relative to `target`.
    fn compare(&self, source: &str, target: &str) -> Ordering;

    /// True when the source must replace the target.
    fn is_newer(&self, source: &str, target: &str) -> bool {
        self.compare(source, target) == Ordering::Greater
    }
}

/// Plain byte-wise string ordering.
#[derive(Debug, Clone, Copy, Default)]
pub struct Lexicographic;

impl FreshnessComparator for Lexicographic {
    fn compare(&self, source: &str, target: &str) -> Ordering {
        source.cmp(target)
    }
}

/// Numeric ordering, falling back to [`Lexicographic`] if either side does
/// not parse as a finite number. An empty (missing) value sorts first.
#[derive(Debug, Clone, Copy, Default)]
pub struct Numeric;

impl FreshnessComparator for Numeric {
    fn compare(&self, source: &str, target: &str) -> Ordering {
        match (source.is_empty(), target.is_empty()) {
            (true, true) => return Ordering::Equal,
            (true, false) => return Ordering::Less,
            (false, true) => return Ordering::Greater,
            _ => {}
        }
        match (parse_finite(source), parse_finite(target)) {
            (Some(a), Some(b)) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
            _ => Lexicographic.compare(source, target),
        }
    }
}

fn parse_finite(s: &str) -> Option<f64> {
    s.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Configurable choice of built-in comparator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FreshnessOrder {
    #[default]
    Lexicographic,
    Numeric,
}

impl FreshnessOrder {
    pub fn comparator(self) -> Box<dyn FreshnessComparator> {
        match self {
            FreshnessOrder::Lexicographic => Box::new(Lexicographic),
            FreshnessOrder::Numeric => Box::new(Numeric),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lexicographic_iso_dates() {
        assert!(Lexicographic.is_newer("2020-01-01", "2019-01-01"));
        assert!(!Lexicographic.is_newer("2019-01-01", "2020-01-01"));
        assert!(!Lexicographic.is_newer("2020-01-01", "2020-01-01"));
    }

    #[test]
    fn test_lexicographic_anything_beats_missing() {
        assert!(Lexicographic.is_newer("a", ""));
        assert!(!Lexicographic.is_newer("", ""));
    }

    #[test]
    fn test_lexicographic_is_not_numeric() {
        // Known limitation of the default ordering.
        assert!(!Lexicographic.is_newer("10", "9"));
    }

    #[test]
    fn test_numeric_ordering() {
        assert!(Numeric.is_newer("10", "9"));
        assert!(Numeric.is_newer("1.5", "1.25"));
        assert!(!Numeric.is_newer("9", "10"));
        assert!(!Numeric.is_newer("10", "10.0"));
    }

    #[test]
    fn test_numeric_missing_values() {
        assert!(Numeric.is_newer("1", ""));
        assert!(!Numeric.is_newer("", "1"));
        assert!(!Numeric.is_newer("", ""));
    }

    #[test]
    fn test_numeric_falls_back_for_non_numbers() {
        assert!(Numeric.is_newer("b", "a"));
        assert!(Numeric.is_newer("abc", "10"));
        assert!(!Numeric.is_newer("NaN", "zzz"));
    }

    #[test]
    fn test_order_builds_comparator() {
        assert!(!FreshnessOrder::Lexicographic.comparator().is_newer("10", "9"));
        assert!(FreshnessOrder::Numeric.comparator().is_newer("10", "9"));
    }

    #[test]
    fn test_order_serde_names() {
        let order: FreshnessOrder = serde_json::from_str("\"numeric\"").unwrap();
        assert_eq!(order, FreshnessOrder::Numeric);
        assert_eq!(
            serde_json::to_string(&FreshnessOrder::Lexicographic).unwrap(),
            "\"lexicographic\""
        );
    }
}
