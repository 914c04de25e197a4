//! HTTP access to storefront APIs.
//!
//! Sources talk to the network only through [`CatalogClient`], so tests can
//! swap in canned JSON without touching the parsing or eligibility code.

use std::time::Duration;

use serde::de::DeserializeOwned;

use crate::error::FetchError;

/// Fetches a URL and returns its body parsed as JSON.
pub trait CatalogClient: Send + Sync {
    fn get_json(&self, url: &str) -> Result<serde_json::Value, FetchError>;
}

/// Fetch `url` through `client` and decode it into `T`.
pub fn get_typed<T: DeserializeOwned>(
    client: &dyn CatalogClient,
    url: &str,
) -> Result<T, FetchError> {
    let value = client.get_json(url)?;
    serde_json::from_value(value).map_err(|source| FetchError::Decode {
        url: url.to_string(),
        source,
    })
}

/// Blocking [`reqwest`] client with a per-request timeout.
pub struct HttpCatalogClient {
    client: reqwest::blocking::Client,
}

impl HttpCatalogClient {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }
}

impl CatalogClient for HttpCatalogClient {
    fn get_json(&self, url: &str) -> Result<serde_json::Value, FetchError> {
        let http_err = |source| FetchError::Http {
            url: url.to_string(),
            source,
        };
        let body = self
            .client
            .get(url)
            .send()
            .and_then(|response| response.error_for_status())
            .and_then(|response| response.text())
            .map_err(http_err)?;
        serde_json::from_str(&body).map_err(|source| FetchError::Decode {
            url: url.to_string(),
            source,
        })
    }
}
