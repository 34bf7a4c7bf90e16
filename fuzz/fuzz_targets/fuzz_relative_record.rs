#![no_main]

//! Fuzz testing for relative record name derivation.
//!
//! Arbitrary FQDN/zone pairs must never panic (byte-wise suffix matching has
//! to respect UTF-8 boundaries) and must never produce an empty record name.

use hcloud_dns01::hcloud::relative_record_name;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: (&str, &str)| {
    let (fqdn, zone) = data;

    let relative = relative_record_name(fqdn, zone);
    assert!(!relative.is_empty(), "record name must be non-empty");
});
