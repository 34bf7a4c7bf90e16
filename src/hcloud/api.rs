//! Low-level Hetzner Cloud DNS API client.
//!
//! Thin authenticated JSON transport over `<base_url>/v1/zones…` with a
//! bounded retry on server errors. Endpoint semantics live in the provider;
//! this module only knows how to talk.
//!
//! # API Reference
//!
//! - [Hetzner Cloud API Documentation](https://docs.hetzner.cloud/)
//! - [DNS Zones](https://docs.hetzner.cloud/reference/cloud#zones)

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::{Client as HttpClient, Method};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::value::RawValue;
use thiserror::Error;
use tracing::warn;
use url::Url;

use crate::BoxError;

/// Total attempts for a request answered with a 5xx status.
pub(crate) const MAX_RETRIES: u32 = 3;

/// Errors surfaced by the Hetzner Cloud DNS-01 provider.
#[derive(Debug, Error)]
pub enum HcloudError {
    /// Invalid or incomplete provider configuration.
    #[error("hcloud: {0}")]
    Config(String),

    /// The zone locator could not map the challenge FQDN to a zone.
    #[error("hcloud: could not find zone for domain {domain:?}")]
    ZoneLocation {
        /// Domain the challenge was requested for.
        domain: String,
        #[source]
        source: BoxError,
    },

    /// No zone with the requested name exists in the account.
    #[error("hcloud: zone {name:?} not found")]
    ZoneNotFound {
        /// Zone name the paginated listing was scanned for.
        name: String,
    },

    /// The HTTP layer failed before a response was received. Not retried.
    #[error("hcloud: api request failed: {0}")]
    Request(#[source] reqwest::Error),

    /// The response body could not be read.
    #[error("hcloud: failed to read response: {0}")]
    ReadResponse(#[source] reqwest::Error),

    /// The API answered with a non-success status. Server errors land here
    /// after the retry budget is spent, client errors immediately.
    #[error("hcloud: API request {method} {path} failed: {message}")]
    Status {
        /// HTTP verb of the failed request.
        method: Method,
        /// Request path including the encoded query, if any.
        path: String,
        /// Response body, or the status line when the body was empty.
        message: String,
    },

    /// A 2xx response was not the expected JSON shape.
    #[error("hcloud: decode response: {0}")]
    Decode(#[from] serde_json::Error),

    /// A 2xx response carried no usable identifier.
    #[error("hcloud: identifier missing")]
    IdentifierMissing,
}

/// Authenticated JSON client for the zone API.
#[derive(Debug)]
pub struct Client {
    http: HttpClient,
    base_url: Url,
}

impl Client {
    pub(crate) fn new(token: &str, base_url: Url, timeout: Duration) -> Result<Self, HcloudError> {
        let mut headers = HeaderMap::new();
        let mut auth = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|err| HcloudError::Config(format!("invalid token: {err}")))?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let http = HttpClient::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|err| HcloudError::Config(format!("failed to build HTTP client: {err}")))?;

        Ok(Client { http, base_url })
    }

    pub(crate) async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Option<T>, HcloudError> {
        self.request(Method::GET, path, query, None).await
    }

    pub(crate) async fn post<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<Option<T>, HcloudError> {
        self.request(Method::POST, path, &[], Some(body)).await
    }

    pub(crate) async fn delete(&self, path: &str) -> Result<(), HcloudError> {
        self.request::<serde::de::IgnoredAny>(Method::DELETE, path, &[], None)
            .await
            .map(|_| ())
    }

    /// Sends one API request, retrying up to [`MAX_RETRIES`] times on 5xx.
    ///
    /// Network-layer failures are not retried: a server that answers is
    /// transiently broken, a server that cannot be reached is an outage.
    /// Returns `None` when the response body was empty.
    async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<&serde_json::Value>,
    ) -> Result<Option<T>, HcloudError> {
        let mut url = self
            .base_url
            .join(path)
            .map_err(|err| HcloudError::Config(format!("invalid request path {path:?}: {err}")))?;
        if !query.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(query.iter().map(|(k, v)| (*k, v.as_str())));
        }

        let path_with_query = match url.query() {
            Some(q) => format!("{path}?{q}"),
            None => path.to_string(),
        };

        let mut attempt = 1;
        loop {
            let mut request = self.http.request(method.clone(), url.clone());
            if let Some(body) = body {
                request = request.json(body);
            }

            let response = request.send().await.map_err(HcloudError::Request)?;

            let status = response.status();
            let data = response.text().await.map_err(HcloudError::ReadResponse)?;

            if status.is_server_error() {
                warn!(
                    "hcloud: request {method} {path_with_query} failed with status {status} \
                     (attempt {attempt}/{MAX_RETRIES})"
                );
                if attempt == MAX_RETRIES {
                    return Err(HcloudError::Status {
                        method,
                        path: path_with_query,
                        message: status.to_string(),
                    });
                }
                attempt += 1;
                continue;
            }

            if status.is_client_error() {
                let message = data.trim();
                let message = if message.is_empty() {
                    status.to_string()
                } else {
                    message.to_string()
                };
                return Err(HcloudError::Status {
                    method,
                    path: path_with_query,
                    message,
                });
            }

            if data.is_empty() {
                return Ok(None);
            }

            return Ok(Some(serde_json::from_str(&data)?));
        }
    }
}

/// A zone as returned by `GET /v1/zones`.
#[derive(Debug, Deserialize)]
pub struct Zone {
    /// Opaque identifier; the API emits either a JSON number or string.
    pub id: Box<RawValue>,
    /// Zone name in punycode ASCII form, no trailing dot.
    pub name: String,
}

/// One page of a zone listing.
#[derive(Debug, Deserialize)]
pub struct ZonesPage {
    pub zones: Vec<Zone>,
    pub meta: Meta,
}

#[derive(Debug, Deserialize)]
pub struct Meta {
    pub pagination: Pagination,
}

#[derive(Debug, Deserialize)]
pub struct Pagination {
    /// Next page index, or `null`/absent on the last page.
    #[serde(default)]
    pub next_page: Option<i64>,
}

/// A record as returned by the records endpoints.
#[derive(Debug, Deserialize)]
pub struct Record {
    /// Opaque identifier with the same string-or-number polymorphism as
    /// [`Zone::id`].
    pub id: Box<RawValue>,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type", default)]
    pub record_type: String,
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub ttl: Option<u32>,
}

/// Envelope around a single record, as returned on create.
#[derive(Debug, Deserialize)]
pub struct RecordEnvelope {
    pub record: Record,
}

/// Canonicalizes a wire identifier into a plain string.
///
/// Identifiers arrive as either a JSON number or a JSON string; one layer of
/// surrounding double quotes is stripped. An identifier that comes out empty
/// is an error.
pub fn parse_identifier(raw: &RawValue) -> Result<String, HcloudError> {
    let raw = raw.get();
    let id = match raw
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
    {
        Some(inner) => inner,
        None => raw,
    };

    if id.is_empty() {
        return Err(HcloudError::IdentifierMissing);
    }

    Ok(id.to_string())
}
