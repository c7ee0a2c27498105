use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::Value;
use std::time::Duration;

use crate::config::CacheConfig;
use crate::error::{ConfigError, FetchError};
use crate::fetcher::Fetcher;

/// Fetcher issuing HTTP GET requests with reqwest.
///
/// - 2xx with a JSON body -> `Ok`
/// - 404 -> `FetchError::NotFound`
/// - other statuses and transport failures -> `FetchError::Network`
/// - 2xx with a body that is not JSON -> `FetchError::Decode`
#[derive(Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    /// Create a fetcher using the timeout from `config`.
    pub fn new(config: &CacheConfig) -> Result<Self, ConfigError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()?;
        Ok(HttpFetcher { client })
    }

    /// Wrap an existing client.
    pub fn with_client(client: reqwest::Client) -> Self {
        HttpFetcher { client }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn fetch(&self, url: &str) -> Result<Value, FetchError> {
        let response = self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| FetchError::network(url, None, e.to_string()))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(FetchError::not_found(url));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| FetchError::network(url, Some(status.as_u16()), e.to_string()))?;

        if !status.is_success() {
            let text = String::from_utf8_lossy(&body);
            return Err(FetchError::network(
                url,
                Some(status.as_u16()),
                text.trim().to_string(),
            ));
        }

        serde_json::from_slice(&body).map_err(|e| FetchError::decode(url, e.to_string()))
    }
}
