//! Tests for FQDN handling and relative record name derivation.

use hcloud_dns01::dns01::{challenge_info, to_fqdn, unfqdn};
use hcloud_dns01::hcloud::relative_record_name;

#[test]
fn unfqdn_strips_one_trailing_dot() {
    assert_eq!(unfqdn("example.com."), "example.com");
    assert_eq!(unfqdn("example.com"), "example.com");
    assert_eq!(unfqdn("example.com.."), "example.com.");
}

#[test]
fn to_fqdn_appends_a_single_dot() {
    assert_eq!(to_fqdn("example.com"), "example.com.");
    assert_eq!(to_fqdn("example.com."), "example.com.");
}

#[test]
fn challenge_info_prefixes_the_domain() {
    let info = challenge_info("example.com", "keyAuth");
    assert_eq!(info.effective_fqdn, "_acme-challenge.example.com.");
    assert_eq!(info.value, "keyAuth");

    // A domain already in FQDN form is not double-dotted.
    let info = challenge_info("example.com.", "keyAuth");
    assert_eq!(info.effective_fqdn, "_acme-challenge.example.com.");
}

#[test]
fn apex_record_falls_back_to_the_challenge_label() {
    assert_eq!(
        relative_record_name("example.com", "example.com"),
        "_acme-challenge"
    );
}

#[test]
fn subdomain_record_is_cut_at_the_zone_boundary() {
    assert_eq!(
        relative_record_name("_acme-challenge.example.com", "example.com"),
        "_acme-challenge"
    );
    assert_eq!(
        relative_record_name("_acme-challenge.www.example.com", "example.com"),
        "_acme-challenge.www"
    );
}

#[test]
fn zone_comparison_is_case_insensitive() {
    assert_eq!(
        relative_record_name("_acme-challenge.Example.COM", "example.com"),
        "_acme-challenge"
    );
    assert_eq!(
        relative_record_name("_acme-challenge.www.example.com", "Example.Com"),
        "_acme-challenge.www"
    );
}

#[test]
fn name_outside_the_zone_is_kept_verbatim() {
    assert_eq!(
        relative_record_name("_acme-challenge.other.org", "example.com"),
        "_acme-challenge.other.org"
    );
}

#[test]
fn already_prefixed_apex_is_not_prefixed_again() {
    // The caller passed the challenge FQDN for the zone apex; the derived
    // name is exactly the challenge label, not a doubled prefix.
    assert_eq!(
        relative_record_name("_acme-challenge.example.com", "example.com"),
        "_acme-challenge"
    );
}

#[test]
fn zone_longer_than_the_name_is_kept_verbatim() {
    assert_eq!(
        relative_record_name("com", "example.com"),
        "com"
    );
}
