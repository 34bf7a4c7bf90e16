#![no_main]

//! Fuzz testing for wire identifier canonicalization.
//!
//! Identifiers arrive from the API as raw JSON fragments (number or string).
//! This tests that arbitrary fragments never cause panics and that every
//! accepted identifier is non-empty.

use hcloud_dns01::hcloud::api::parse_identifier;
use libfuzzer_sys::fuzz_target;
use serde_json::value::RawValue;

fuzz_target!(|data: &str| {
    if let Ok(raw) = RawValue::from_string(data.to_string()) {
        if let Ok(id) = parse_identifier(&raw) {
            assert!(!id.is_empty(), "accepted identifier must be non-empty");
        }
    }
});
