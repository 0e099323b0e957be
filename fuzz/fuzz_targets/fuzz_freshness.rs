//! Fuzz target for freshness comparison.
//!
//! Neither comparator may panic, and "newer than" must stay asymmetric.

#![no_main]

use libfuzzer_sys::fuzz_target;
use replication_target::freshness::{FreshnessComparator, Lexicographic, Numeric};

fuzz_target!(|data: (&str, &str)| {
    let (a, b) = data;

    for cmp in [&Lexicographic as &dyn FreshnessComparator, &Numeric] {
        assert!(!cmp.is_newer(a, a));
        assert!(!(cmp.is_newer(a, b) && cmp.is_newer(b, a)));
    }
});
