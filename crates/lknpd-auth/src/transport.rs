//! HTTP transport over reqwest
//!
//! One `reqwest::Client` carrying the default headers and timeouts, shared by
//! the auth strategies and the API client. The transport knows nothing about
//! authentication; it only joins base URLs to paths and sends JSON bodies.
//! Deadlines and cancellation are delegated entirely to reqwest's per-call
//! timeouts; there is no retry or backoff at this layer.

use std::time::Duration;

use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, HeaderMap, HeaderValue};

use crate::constants::{self, BASE_URL_V1, BASE_URL_V2};

/// Connection settings for the outbound HTTP client.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Main API base (`/api/v1` in production)
    pub base_url: String,
    /// Base for the SMS challenge start endpoint (`/api/v2` in production)
    pub challenge_base_url: String,
    /// Total per-request timeout
    pub timeout: Duration,
    /// Connection establishment timeout
    pub connect_timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            base_url: BASE_URL_V1.to_owned(),
            challenge_base_url: BASE_URL_V2.to_owned(),
            timeout: Duration::from_secs(5),
            connect_timeout: Duration::from_secs(5),
        }
    }
}

/// HTTP transport for API requests.
pub struct Transport {
    client: reqwest::Client,
    base_url: String,
    challenge_base_url: String,
}

impl Transport {
    /// Build a transport from connection settings.
    pub fn new(config: TransportConfig) -> reqwest::Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(constants::ACCEPT));
        headers.insert(
            ACCEPT_LANGUAGE,
            HeaderValue::from_static(constants::ACCEPT_LANGUAGE),
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_owned(),
            challenge_base_url: config.challenge_base_url.trim_end_matches('/').to_owned(),
        })
    }

    /// Full URL for a path under the main API base.
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// POST a JSON body to a path under the main API base.
    pub async fn post(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> reqwest::Result<reqwest::Response> {
        self.client.post(self.url(path)).json(body).send().await
    }

    /// POST a JSON body to a path under the challenge base (`/api/v2`).
    pub async fn post_challenge(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> reqwest::Result<reqwest::Response> {
        let url = format!(
            "{}/{}",
            self.challenge_base_url,
            path.trim_start_matches('/')
        );
        self.client.post(url).json(body).send().await
    }

    /// The underlying reqwest client, for arbitrary authenticated calls.
    pub fn raw(&self) -> &reqwest::Client {
        &self.client
    }
}
