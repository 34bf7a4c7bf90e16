//! Hetzner Cloud DNS-01 challenge provider implementation.
//!
//! This provider uses the Hetzner Cloud API with Bearer token authentication.
//!
//! # Authentication
//!
//! Requires a Hetzner Cloud API token:
//! - Create a token at: <https://console.hetzner.cloud/projects/*/security/tokens>
//! - The token must have Read & Write permissions for DNS
//!
//! # Environment Variables
//!
//! | Variable | Required | Meaning | Default |
//! |----------|----------|---------|---------|
//! | `HCLOUD_TOKEN` | Yes | API bearer token | — |
//! | `HCLOUD_BASE_URL` | No | API root | `https://api.hetzner.cloud` |
//! | `HCLOUD_TTL` | No | TXT record TTL (seconds) | 60 |
//! | `HCLOUD_PROPAGATION_TIMEOUT` | No | Advertised to the poller (seconds) | 60 |
//! | `HCLOUD_POLLING_INTERVAL` | No | Advertised to the poller (seconds) | 2 |
//! | `HCLOUD_HTTP_TIMEOUT` | No | Per-request ceiling (seconds) | 30 |
//!
//! # Example
//!
//! ```no_run
//! use hcloud_dns01::hcloud::HcloudProvider;
//! use hcloud_dns01::ChallengeProvider;
//!
//! # async fn example() -> Result<(), hcloud_dns01::HcloudError> {
//! let provider = HcloudProvider::new("your_api_token")?;
//!
//! provider.present("example.com", "token", "key-authorization").await?;
//! // ... validation happens ...
//! provider.cleanup("example.com", "token", "key-authorization").await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Caching
//!
//! Zone identifiers are cached for the lifetime of the provider: once a zone
//! name resolves, its identifier never changes. Record identifiers are held
//! between a successful `present` and the matching successful `cleanup`, so
//! cleanup after a failed delete can be retried.

pub mod api;

use std::collections::HashMap;
use std::env;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde_json::json;
use url::Url;

use crate::dns01::{self, ChallengeInfo};
use crate::provider::ChallengeProvider;
use crate::BoxError;

use api::{Client, HcloudError};

/// Environment variable carrying the API bearer token.
pub const ENV_TOKEN: &str = "HCLOUD_TOKEN";
/// Environment variable overriding the API base URL.
pub const ENV_BASE_URL: &str = "HCLOUD_BASE_URL";
/// Environment variable overriding the TXT record TTL, in seconds.
pub const ENV_TTL: &str = "HCLOUD_TTL";
/// Environment variable overriding the propagation timeout, in seconds.
pub const ENV_PROPAGATION_TIMEOUT: &str = "HCLOUD_PROPAGATION_TIMEOUT";
/// Environment variable overriding the polling interval, in seconds.
pub const ENV_POLLING_INTERVAL: &str = "HCLOUD_POLLING_INTERVAL";
/// Environment variable overriding the per-request HTTP timeout, in seconds.
pub const ENV_HTTP_TIMEOUT: &str = "HCLOUD_HTTP_TIMEOUT";

const DEFAULT_BASE_URL: &str = "https://api.hetzner.cloud";
const DEFAULT_TTL: u32 = 60;
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

type LocatorFuture = Pin<Box<dyn Future<Output = Result<String, BoxError>> + Send>>;

/// Maps a challenge FQDN to its authoritative zone FQDN.
pub type ZoneLocatorFn = Box<dyn Fn(&str) -> LocatorFuture + Send + Sync>;

/// Derives the challenge record location and TXT value from the ACME inputs.
pub type ChallengeInfoFn = Box<dyn Fn(&str, &str) -> ChallengeInfo + Send + Sync>;

/// Configuration for [`HcloudProvider`]. Immutable after construction.
#[derive(Clone)]
pub struct Config {
    /// API bearer token. Required, non-empty.
    pub token: String,
    /// Absolute URL of the zone API root. Empty means the default.
    pub base_url: String,
    /// TTL in seconds placed on created TXT records.
    pub ttl: u32,
    /// Propagation timeout advertised to the host poller.
    pub propagation_timeout: Duration,
    /// Polling interval advertised to the host poller.
    pub polling_interval: Duration,
    /// Per-request wall-clock ceiling.
    pub http_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            token: String::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            ttl: DEFAULT_TTL,
            propagation_timeout: dns01::DEFAULT_PROPAGATION_TIMEOUT,
            polling_interval: dns01::DEFAULT_POLLING_INTERVAL,
            http_timeout: DEFAULT_HTTP_TIMEOUT,
        }
    }
}

impl Config {
    /// Builds a configuration from the optional `HCLOUD_*` environment
    /// variables, falling back to the defaults for anything unset, empty, or
    /// unparsable. The token is not read here; see
    /// [`HcloudProvider::from_env`].
    pub fn from_env() -> Self {
        Config {
            token: String::new(),
            base_url: env_string_or(ENV_BASE_URL, DEFAULT_BASE_URL),
            ttl: env_u32_or(ENV_TTL, DEFAULT_TTL),
            propagation_timeout: env_seconds_or(
                ENV_PROPAGATION_TIMEOUT,
                dns01::DEFAULT_PROPAGATION_TIMEOUT,
            ),
            polling_interval: env_seconds_or(
                ENV_POLLING_INTERVAL,
                dns01::DEFAULT_POLLING_INTERVAL,
            ),
            http_timeout: env_seconds_or(ENV_HTTP_TIMEOUT, DEFAULT_HTTP_TIMEOUT),
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("token", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("ttl", &self.ttl)
            .field("propagation_timeout", &self.propagation_timeout)
            .field("polling_interval", &self.polling_interval)
            .field("http_timeout", &self.http_timeout)
            .finish()
    }
}

fn env_string_or(name: &str, default: &str) -> String {
    match env::var(name) {
        Ok(value) if !value.is_empty() => value,
        _ => default.to_string(),
    }
}

fn env_u32_or(name: &str, default: u32) -> u32 {
    env::var(name)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(default)
}

fn env_seconds_or(name: &str, default: Duration) -> Duration {
    env::var(name)
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .map(Duration::from_secs)
        .unwrap_or(default)
}

/// Hetzner Cloud DNS-01 challenge provider.
///
/// Concurrency-safe: share one instance behind an `Arc` across overlapping
/// challenges. Both caches use their own mutex, held only across map access.
pub struct HcloudProvider {
    config: Config,
    client: Client,

    zone_ids: Mutex<HashMap<String, String>>,
    record_ids: Mutex<HashMap<String, String>>,

    zone_locator: ZoneLocatorFn,
    challenge_info: ChallengeInfoFn,
}

impl fmt::Debug for HcloudProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HcloudProvider")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl HcloudProvider {
    /// Creates a provider with the given token and default configuration.
    pub fn new(token: &str) -> Result<Self, HcloudError> {
        Self::new_with_config(Config {
            token: token.to_string(),
            ..Config::default()
        })
    }

    /// Creates a provider configured from the environment.
    ///
    /// `HCLOUD_TOKEN` is required; the remaining `HCLOUD_*` variables are
    /// optional and fall back to the defaults.
    pub fn from_env() -> Result<Self, HcloudError> {
        let token = env::var(ENV_TOKEN)
            .ok()
            .filter(|value| !value.is_empty())
            .ok_or_else(|| HcloudError::Config(format!("{ENV_TOKEN} is missing")))?;

        let mut config = Config::from_env();
        config.token = token;

        Self::new_with_config(config)
    }

    /// Creates a provider from an explicit configuration.
    ///
    /// An empty token is rejected; an empty base URL falls back to the
    /// default; an unparsable base URL is a construction error.
    pub fn new_with_config(mut config: Config) -> Result<Self, HcloudError> {
        if config.token.is_empty() {
            return Err(HcloudError::Config(format!("{ENV_TOKEN} is missing")));
        }

        if config.base_url.is_empty() {
            config.base_url = DEFAULT_BASE_URL.to_string();
        }

        let base_url = Url::parse(&config.base_url).map_err(|err| {
            HcloudError::Config(format!("invalid base URL {:?}: {err}", config.base_url))
        })?;

        let client = Client::new(&config.token, base_url, config.http_timeout)?;

        Ok(HcloudProvider {
            config,
            client,
            zone_ids: Mutex::new(HashMap::new()),
            record_ids: Mutex::new(HashMap::new()),
            zone_locator: Box::new(|fqdn: &str| {
                let fqdn = fqdn.to_owned();
                Box::pin(async move {
                    dns01::find_zone_by_fqdn(&fqdn)
                        .await
                        .map_err(|err| Box::new(err) as BoxError)
                })
            }),
            challenge_info: Box::new(|domain, key_auth| dns01::challenge_info(domain, key_auth)),
        })
    }

    /// Replaces the zone locator used to find the authoritative zone for a
    /// challenge FQDN. Tests substitute this to avoid live DNS.
    pub fn set_zone_locator(&mut self, locator: ZoneLocatorFn) {
        self.zone_locator = locator;
    }

    /// Replaces the helper deriving the challenge location and TXT value.
    pub fn set_challenge_info(&mut self, helper: ChallengeInfoFn) {
        self.challenge_info = helper;
    }

    /// Resolves a zone name (no trailing dot) to its API identifier, through
    /// the cache or via the paginated, server-side-filtered zone listing.
    ///
    /// Concurrent lookups for the same unknown zone may both hit the API;
    /// both writers store identical values, so the race is benign.
    async fn zone_id(&self, zone_name: &str) -> Result<String, HcloudError> {
        let zone_key = zone_name.to_lowercase();

        if let Some(id) = lock(&self.zone_ids).get(&zone_key) {
            return Ok(id.clone());
        }

        let mut page: i64 = 1;
        loop {
            let query = [
                ("name", zone_name.to_string()),
                ("page", page.to_string()),
                ("per_page", "50".to_string()),
            ];

            let listing = match self.client.get::<api::ZonesPage>("/v1/zones", &query).await? {
                Some(listing) => listing,
                None => break,
            };

            for zone in &listing.zones {
                if zone.name.eq_ignore_ascii_case(zone_name) {
                    let id = api::parse_identifier(&zone.id)?;
                    lock(&self.zone_ids).insert(zone_key.clone(), id.clone());
                    return Ok(id);
                }
            }

            match listing.meta.pagination.next_page {
                Some(next) if next > 0 => page = next,
                _ => break,
            }
        }

        Err(HcloudError::ZoneNotFound {
            name: zone_name.to_string(),
        })
    }
}

impl ChallengeProvider for HcloudProvider {
    type Error = HcloudError;

    /// Creates the challenge TXT record and remembers its identifier for
    /// [`cleanup`](ChallengeProvider::cleanup).
    async fn present(&self, domain: &str, _token: &str, key_auth: &str) -> Result<(), HcloudError> {
        let info = (self.challenge_info)(domain, key_auth);

        let auth_zone = (self.zone_locator)(&info.effective_fqdn)
            .await
            .map_err(|err| HcloudError::ZoneLocation {
                domain: domain.to_string(),
                source: err,
            })?;

        let zone_name = dns01::unfqdn(&auth_zone);
        let zone_id = self.zone_id(zone_name).await?;

        let fqdn = dns01::unfqdn(&info.effective_fqdn);
        let record_name = relative_record_name(fqdn, zone_name);

        let payload = json!({
            "name": record_name,
            "type": "TXT",
            "value": info.value,
            "ttl": self.config.ttl,
        });

        let envelope: api::RecordEnvelope = self
            .client
            .post(&format!("/v1/zones/{zone_id}/records"), &payload)
            .await?
            .ok_or(HcloudError::IdentifierMissing)?;

        let record_id = api::parse_identifier(&envelope.record.id)?;

        lock(&self.record_ids).insert(info.effective_fqdn.to_lowercase(), record_id);

        Ok(())
    }

    /// Deletes the TXT record remembered by a prior successful
    /// [`present`](ChallengeProvider::present). A failed delete keeps the
    /// cache entry so cleanup stays retryable; an unknown FQDN is a no-op.
    async fn cleanup(&self, domain: &str, _token: &str, key_auth: &str) -> Result<(), HcloudError> {
        let info = (self.challenge_info)(domain, key_auth);

        let auth_zone = (self.zone_locator)(&info.effective_fqdn)
            .await
            .map_err(|err| HcloudError::ZoneLocation {
                domain: domain.to_string(),
                source: err,
            })?;

        let zone_name = dns01::unfqdn(&auth_zone);

        let record_key = info.effective_fqdn.to_lowercase();
        let record_id = match lock(&self.record_ids).get(&record_key) {
            Some(id) => id.clone(),
            None => return Ok(()),
        };

        let zone_id = self.zone_id(zone_name).await?;

        self.client
            .delete(&format!("/v1/zones/{zone_id}/records/{record_id}"))
            .await?;

        lock(&self.record_ids).remove(&record_key);

        Ok(())
    }

    fn timeout(&self) -> (Duration, Duration) {
        (self.config.propagation_timeout, self.config.polling_interval)
    }
}

/// Computes a record name relative to its enclosing zone.
///
/// Equal names (case-insensitive) give the empty prefix; a name under the
/// zone gives everything before the `.<zone>` suffix; a name outside the zone
/// is returned verbatim. An empty result is replaced by `_acme-challenge`, so
/// the challenge record lands at `_acme-challenge.<zone>` even for a zone-apex
/// request. An already-prefixed name is never re-prefixed.
pub fn relative_record_name(fqdn: &str, zone_name: &str) -> String {
    let suffix = format!(".{zone_name}");

    let relative = if fqdn.eq_ignore_ascii_case(zone_name) {
        ""
    } else if fqdn.len() > suffix.len()
        && fqdn.as_bytes()[fqdn.len() - suffix.len()..].eq_ignore_ascii_case(suffix.as_bytes())
    {
        // The suffix starts with an ASCII dot, so the cut is a char boundary.
        &fqdn[..fqdn.len() - suffix.len()]
    } else {
        fqdn
    };

    if relative.is_empty() {
        "_acme-challenge".to_string()
    } else {
        relative.to_string()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
