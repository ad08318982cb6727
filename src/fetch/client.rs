//! reqwest-backed [`Fetch`] implementation.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, RETRY_AFTER};
use reqwest::{Client, ClientBuilder, Proxy};
use tracing::{debug, instrument};
use url::Url;

use super::{Fetch, FetchError, FetchedBody};
use crate::config::{ConfigError, RunConfig};
use crate::user_agent;

/// Connect timeout cap; the overall request timeout comes from the run config.
const MAX_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP client shared by the adapters and the scheduler.
///
/// Proxy, timeout and User-Agent are fixed at construction; the client is
/// cheap to clone and reuses its connection pool.
#[derive(Debug, Clone)]
pub struct FetchClient {
    client: Client,
}

impl FetchClient {
    /// Builds a client from the run configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidProxy`] when reqwest rejects a proxy URL
    /// and [`ConfigError::HttpClient`] when the client cannot be built.
    pub fn new(config: &RunConfig) -> Result<Self, ConfigError> {
        let mut builder = base_client_builder(config.timeout());
        if let Some(proxy) = config.http_proxy() {
            builder = builder.proxy(build_proxy("http", proxy)?);
        }
        if let Some(proxy) = config.https_proxy() {
            builder = builder.proxy(build_proxy("https", proxy)?);
        }
        let client = builder.build().map_err(|e| ConfigError::HttpClient {
            reason: e.to_string(),
        })?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Fetch for FetchClient {
    #[instrument(skip(self), fields(url = %url))]
    async fn get(&self, url: &str) -> Result<FetchedBody, FetchError> {
        let parsed = Url::parse(url).map_err(|_| FetchError::invalid_url(url))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(FetchError::invalid_url(url));
        }

        let response = self
            .client
            .get(parsed)
            .send()
            .await
            .map_err(|e| FetchError::network(url, e))?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .map(std::string::ToString::to_string);
            debug!(status = status.as_u16(), "non-success status");
            return Err(FetchError::http_status_with_retry_after(
                url,
                status.as_u16(),
                retry_after,
            ));
        }

        let final_url = response.url().to_string();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(std::string::ToString::to_string);
        let bytes = response
            .bytes()
            .await
            .map_err(|e| FetchError::network(url, e))?;

        debug!(bytes = bytes.len(), %final_url, "fetched");
        Ok(FetchedBody {
            status: status.as_u16(),
            final_url,
            content_type,
            bytes: bytes.to_vec(),
        })
    }
}

fn base_client_builder(timeout: Duration) -> ClientBuilder {
    Client::builder()
        .connect_timeout(timeout.min(MAX_CONNECT_TIMEOUT))
        .timeout(timeout)
        .gzip(true)
        .user_agent(user_agent::default_user_agent())
}

fn build_proxy(scheme: &'static str, url: &Url) -> Result<Proxy, ConfigError> {
    let proxy = if scheme == "https" {
        Proxy::https(url.as_str())
    } else {
        Proxy::http(url.as_str())
    };
    proxy.map_err(|e| ConfigError::InvalidProxy {
        scheme,
        value: url.to_string(),
        reason: e.to_string(),
    })
}
