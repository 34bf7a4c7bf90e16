//! DNS-01 ACME challenge provider for Hetzner Cloud DNS.
//!
//! This crate publishes and removes the `_acme-challenge` TXT records an ACME
//! client (e.g. Let's Encrypt) uses to validate domain control, by driving the
//! Hetzner Cloud zone API. It is a library component: the host ACME engine
//! decides when to present a challenge, polls DNS for propagation using the
//! timings the provider advertises, and finally asks for cleanup.
//!
//! # Example
//!
//! ```no_run
//! use hcloud_dns01::{ChallengeProvider, HcloudProvider};
//!
//! # async fn example() -> Result<(), hcloud_dns01::HcloudError> {
//! // Reads HCLOUD_TOKEN and the optional HCLOUD_* tuning variables.
//! let provider = HcloudProvider::from_env()?;
//!
//! provider.present("example.com", "token", "key-authorization").await?;
//!
//! let (timeout, interval) = provider.timeout();
//! // ... poll DNS with `interval` until the record is visible or `timeout`
//! // elapses, let the ACME server validate ...
//!
//! provider.cleanup("example.com", "token", "key-authorization").await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Concurrency
//!
//! A single provider instance serves many overlapping challenges. Share it
//! behind an [`std::sync::Arc`]; the internal zone and record caches are
//! synchronized and no lock is ever held across a network call.

pub mod dns01;
pub mod hcloud;

mod provider;

pub use hcloud::api::HcloudError;
pub use hcloud::{Config, HcloudProvider};
pub use provider::ChallengeProvider;

/// Boxed error produced by the pluggable helper functions.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;
