//! HTTP access to remote media hosts.
//!
//! Every request carries a desktop browser User-Agent and a Referer pointing
//! at the target's own origin; hosts with hotlink protection tend to reject
//! anything else.

use std::time::Duration;

use {
    reqwest::{
        Response,
        header::{REFERER, USER_AGENT},
    },
    url::Url,
    webp2u_config::MediaConfig,
};

use crate::{Error, Result};

#[derive(Debug, Clone)]
pub struct MediaClient {
    http: reqwest::Client,
    user_agent: String,
    timeout: Duration,
}

impl MediaClient {
    pub fn from_config(config: &MediaConfig) -> Result<Self> {
        Self::new(
            config.user_agent.clone(),
            Duration::from_secs(config.request_timeout_secs),
        )
    }

    pub fn new(user_agent: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::external("failed to build HTTP client", e))?;
        Ok(Self {
            http,
            user_agent: user_agent.into(),
            timeout,
        })
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Header-only probe. HTTP error statuses are returned as errors.
    pub async fn head(&self, url: &Url) -> reqwest::Result<Response> {
        self.http
            .head(url.as_str())
            .header(USER_AGENT, &self.user_agent)
            .header(REFERER, referer_for(url))
            .send()
            .await?
            .error_for_status()
    }

    /// Streaming download. The body is left unread for the caller.
    pub async fn get(&self, url: &Url) -> reqwest::Result<Response> {
        self.http
            .get(url.as_str())
            .header(USER_AGENT, &self.user_agent)
            .header(REFERER, referer_for(url))
            .send()
            .await?
            .error_for_status()
    }
}

/// `scheme://host[:port]/` of the target.
#[must_use]
pub fn referer_for(url: &Url) -> String {
    format!("{}/", url.origin().ascii_serialization())
}

/// Parse a candidate string as an absolute http(s) URL.
pub fn parse_url(raw: &str) -> Result<Url> {
    Url::parse(raw).map_err(|source| Error::InvalidUrl {
        url: raw.to_string(),
        source,
    })
}
