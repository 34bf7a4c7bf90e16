//! Common test utilities shared across test modules.
//!
//! This module provides helpers for setting up mock servers, building
//! providers wired to them, and capturing log output.

use std::fmt::Write as _;
use std::sync::{Arc, Mutex};

use hcloud_dns01::hcloud::ZoneLocatorFn;
use hcloud_dns01::{Config, HcloudProvider};
use tracing::field::{Field, Visit};
use tracing::span::{Attributes, Id, Record};
use tracing::{Event, Level, Metadata, Subscriber};
use wiremock::MockServer;

/// Test constants used across multiple test modules.
#[allow(dead_code)]
pub mod constants {
    /// Standard test token used in mock tests.
    pub const TEST_TOKEN: &str = "secret";
}

/// Sets up a new mock server for testing.
///
/// This is the standard way to create a mock server in tests.
pub async fn setup_mock_server() -> MockServer {
    MockServer::start().await
}

/// Builds a provider pointed at a mock server, with the zone locator pinned
/// to `zone` so no live DNS is involved.
#[allow(dead_code)]
pub fn test_provider(base_url: &str, zone: &'static str) -> HcloudProvider {
    let mut provider = HcloudProvider::new_with_config(Config {
        token: constants::TEST_TOKEN.to_string(),
        base_url: base_url.to_string(),
        ..Config::default()
    })
    .expect("failed to create provider");

    provider.set_zone_locator(fixed_zone_locator(zone));
    provider
}

/// A zone locator that always answers with the given zone FQDN.
#[allow(dead_code)]
pub fn fixed_zone_locator(zone: &'static str) -> ZoneLocatorFn {
    Box::new(move |_fqdn| Box::pin(async move { Ok(zone.to_string()) }))
}

/// Minimal `tracing` subscriber that records event messages, so tests can
/// assert on the warnings emitted by the retry loop.
#[derive(Clone, Default)]
pub struct RecordingSubscriber {
    messages: Arc<Mutex<Vec<(Level, String)>>>,
}

#[allow(dead_code)]
impl RecordingSubscriber {
    pub fn new() -> Self {
        Self::default()
    }

    /// True if any warning message contains `needle`.
    pub fn contains_warning(&self, needle: &str) -> bool {
        self.messages
            .lock()
            .expect("message lock poisoned")
            .iter()
            .any(|(level, message)| *level == Level::WARN && message.contains(needle))
    }

    pub fn warning_count(&self) -> usize {
        self.messages
            .lock()
            .expect("message lock poisoned")
            .iter()
            .filter(|(level, _)| *level == Level::WARN)
            .count()
    }
}

struct MessageVisitor(String);

impl Visit for MessageVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            let _ = write!(self.0, "{value:?}");
        }
    }
}

impl Subscriber for RecordingSubscriber {
    fn enabled(&self, _metadata: &Metadata<'_>) -> bool {
        true
    }

    fn new_span(&self, _attrs: &Attributes<'_>) -> Id {
        Id::from_u64(1)
    }

    fn record(&self, _span: &Id, _values: &Record<'_>) {}

    fn record_follows_from(&self, _span: &Id, _follows: &Id) {}

    fn event(&self, event: &Event<'_>) {
        let mut visitor = MessageVisitor(String::new());
        event.record(&mut visitor);

        self.messages
            .lock()
            .expect("message lock poisoned")
            .push((*event.metadata().level(), visitor.0));
    }

    fn enter(&self, _span: &Id) {}

    fn exit(&self, _span: &Id) {}
}

/// Hetzner Cloud API mock payloads.
#[allow(dead_code)]
pub mod hcloud {
    use serde_json::{json, Value};

    /// One page of `GET /v1/zones` with the given `(id, name)` pairs.
    ///
    /// `id` is passed through verbatim so tests can exercise both the JSON
    /// number and JSON string forms.
    pub fn zones_page(zones: &[(Value, &str)], next_page: Value) -> Value {
        json!({
            "zones": zones
                .iter()
                .map(|(id, name)| json!({ "id": id, "name": name }))
                .collect::<Vec<_>>(),
            "meta": {
                "pagination": {
                    "next_page": next_page
                }
            }
        })
    }

    /// Envelope returned by `POST /v1/zones/<id>/records`.
    pub fn record_envelope(id: Value, name: &str, value: &str) -> Value {
        json!({
            "record": {
                "id": id,
                "name": name,
                "type": "TXT",
                "value": value
            }
        })
    }
}
