use std::error::Error as StdError;
use std::time::Duration;

use crate::dns01;

/// A DNS-01 challenge provider as consumed by a host ACME engine.
///
/// Implementations must tolerate concurrent use: authorizations are solved in
/// parallel, so [`present`](ChallengeProvider::present) and
/// [`cleanup`](ChallengeProvider::cleanup) may run for many domains at once.
#[allow(async_fn_in_trait)]
pub trait ChallengeProvider {
    /// Error type surfaced to the ACME engine.
    type Error: StdError + Send + Sync + 'static;

    /// Publishes the TXT record that answers the challenge for `domain`.
    async fn present(
        &self,
        domain: &str,
        token: &str,
        key_auth: &str,
    ) -> Result<(), Self::Error>;

    /// Removes the record published by a prior successful
    /// [`present`](ChallengeProvider::present). Cleaning up a challenge that
    /// was never presented is a successful no-op.
    async fn cleanup(
        &self,
        domain: &str,
        token: &str,
        key_auth: &str,
    ) -> Result<(), Self::Error>;

    /// Upper bound and probe interval the engine should use while waiting for
    /// the published record to become visible on authoritative DNS.
    fn timeout(&self) -> (Duration, Duration) {
        (
            dns01::DEFAULT_PROPAGATION_TIMEOUT,
            dns01::DEFAULT_POLLING_INTERVAL,
        )
    }
}
