//! Outbound client for the `/external` passthrough.
//!
//! # Responsibilities
//! - Hold a pooled HTTP client bound to the configured upstream URL
//! - Enforce connect and total timeouts on every call
//!
//! # Design Decisions
//! - No retries: a failed call is reported once to the caller
//! - Timed-out calls surface as ordinary errors (mapped to 502 by the handler)

use std::time::Duration;

use url::Url;

use crate::config::UpstreamConfig;

/// Error type for upstream client construction.
#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    #[error("invalid upstream url: {0}")]
    Url(#[from] url::ParseError),
    #[error("failed to build http client: {0}")]
    Client(#[from] reqwest::Error),
}

/// Client for the fixed upstream.
#[derive(Clone, Debug)]
pub struct UpstreamClient {
    client: reqwest::Client,
    url: Url,
}

impl UpstreamClient {
    pub fn new(config: &UpstreamConfig) -> Result<Self, UpstreamError> {
        let url = Url::parse(&config.url)?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .build()?;
        Ok(Self { client, url })
    }

    /// The upstream URL.
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Issue the upstream GET. The body is left unread for streaming.
    pub async fn fetch(&self) -> Result<reqwest::Response, reqwest::Error> {
        self.client.get(self.url.clone()).send().await
    }
}
