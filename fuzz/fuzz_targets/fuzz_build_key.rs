//! Fuzz target for key construction and validation.
//!
//! Any accepted key must be free of forbidden characters and must not
//! start with the reserved `$` prefix.

#![no_main]

use libfuzzer_sys::fuzz_target;
use replication_target::key::{validate_key_value, FORBIDDEN_KEY_CHARS};

fuzz_target!(|value: &str| {
    if validate_key_value(value).is_ok() {
        assert!(!value.is_empty());
        assert!(!value.starts_with('$'));
        assert!(!value.chars().any(|c| FORBIDDEN_KEY_CHARS.contains(&c)));
    }
});
