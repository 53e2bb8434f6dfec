//! Blocking HTTP fetcher for the update feed.

use deckgen_core::sync::{HttpFetcher, HttpResponse};
use deckgen_core::{Error, Result};
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// [`HttpFetcher`] backed by a blocking `reqwest` client.
pub struct ReqwestFetcher {
    client: reqwest::blocking::Client,
}

impl ReqwestFetcher {
    pub fn new() -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("deckgen/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::HttpError(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }
}

impl HttpFetcher for ReqwestFetcher {
    fn get(&self, url: &str) -> Result<HttpResponse> {
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|e| Error::HttpError(e.to_string()))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .map_err(|e| Error::HttpError(format!("Failed to read body of {}: {}", url, e)))?;
        Ok(HttpResponse { status, body })
    }
}
