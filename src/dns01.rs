//! DNS-01 challenge primitives.
//!
//! The helpers here are provider-independent: where the challenge record
//! lives, how FQDNs are normalized, and which zone is authoritative for a
//! name. Providers consume them through pluggable hooks so tests can
//! substitute both.

use std::time::Duration;

use once_cell::sync::OnceCell;
use trust_dns_resolver::{
    error::{ResolveError, ResolveErrorKind},
    IntoName, TokioAsyncResolver,
};

/// How long the host should wait for a published record to propagate.
pub const DEFAULT_PROPAGATION_TIMEOUT: Duration = Duration::from_secs(60);

/// How often the host should probe DNS while waiting.
pub const DEFAULT_POLLING_INTERVAL: Duration = Duration::from_secs(2);

/// Where a DNS-01 challenge must be published and with which TXT value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChallengeInfo {
    /// Fully-qualified record name, trailing dot included.
    pub effective_fqdn: String,
    /// TXT record payload. Case is preserved verbatim.
    pub value: String,
}

/// Derives the default challenge location for `domain`.
///
/// The record lives at `_acme-challenge.<domain>.`; the key authorization is
/// passed through unchanged, since the host ACME engine supplies it already
/// digested into the TXT form.
pub fn challenge_info(domain: &str, key_auth: &str) -> ChallengeInfo {
    ChallengeInfo {
        effective_fqdn: format!("_acme-challenge.{}", to_fqdn(domain)),
        value: key_auth.to_string(),
    }
}

/// Strips one trailing dot, turning an FQDN into a plain name.
pub fn unfqdn(name: &str) -> &str {
    name.strip_suffix('.').unwrap_or(name)
}

/// Appends a trailing dot unless one is already present.
pub fn to_fqdn(name: &str) -> String {
    if name.ends_with('.') {
        name.to_string()
    } else {
        format!("{name}.")
    }
}

/// TODO: don't use a global resolver to allow for better configuration
static RESOLVER: OnceCell<TokioAsyncResolver> = OnceCell::new();

/// Finds the authoritative zone for an FQDN by walking the name towards the
/// root until an SOA record answers.
///
/// Returns the zone as an FQDN with trailing dot. This is the default zone
/// locator; hosts with special delegation setups can replace it on the
/// provider.
pub async fn find_zone_by_fqdn(fqdn: &str) -> Result<String, ResolveError> {
    let resolver = RESOLVER.get_or_try_init(TokioAsyncResolver::tokio_from_system_conf)?;

    let mut name = fqdn.into_name()?;
    loop {
        let lookup = resolver.soa_lookup(name.clone()).await;
        match lookup {
            Ok(lookup) => {
                let records = lookup.as_lookup().records();
                debug_assert_ne!(records.len(), 0);
                let record = records.first().expect("SOA lookup returned no records");

                break Ok(record.name().to_utf8());
            }
            Err(e) if matches!(e.kind(), ResolveErrorKind::NoRecordsFound { .. }) => {
                if name.num_labels() > 1 {
                    name = name.base_name();
                    continue;
                } else {
                    break Err(e);
                }
            }
            Err(e) => break Err(e),
        }
    }
}
