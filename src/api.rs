use async_trait::async_trait;
use reqwest::header::{ACCEPT, REFERER};
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::{CrawlError, Result};
use crate::utils::preview;

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

pub const HTML_ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";
pub const JSON_ACCEPT: &str = "application/json, text/javascript, */*; q=0.01";

/// Per-source request shaping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestProfile {
    pub accept: &'static str,
    pub referer: Option<&'static str>,
    /// Page to load first so the site sets its session cookies.
    pub warm_up: Option<&'static str>,
    pub ajax: bool,
}

impl RequestProfile {
    pub const fn html() -> Self {
        Self {
            accept: HTML_ACCEPT,
            referer: None,
            warm_up: None,
            ajax: false,
        }
    }

    pub const fn json() -> Self {
        Self {
            accept: JSON_ACCEPT,
            referer: None,
            warm_up: None,
            ajax: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub url: String,
    pub profile: RequestProfile,
}

impl FetchRequest {
    pub fn new(url: impl Into<String>, profile: RequestProfile) -> Self {
        Self {
            url: url.into(),
            profile,
        }
    }
}

#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, request: &FetchRequest) -> Result<String>;
}

pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .cookie_store(true)
            .gzip(true)
            .build()?;
        Ok(Self { client })
    }

    async fn get(&self, url: &str, profile: &RequestProfile) -> Result<String> {
        let mut builder = self.client.get(url).header(ACCEPT, profile.accept);
        if let Some(referer) = profile.referer {
            builder = builder.header(REFERER, referer);
        }
        if profile.ajax {
            builder = builder.header("X-Requested-With", "XMLHttpRequest");
        }

        let response = builder.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(CrawlError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.text().await?;
        debug!(url, bytes = body.len(), head = %preview(&body, 80), "fetched");
        Ok(body)
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, request: &FetchRequest) -> Result<String> {
        if let Some(warm_up) = request.profile.warm_up {
            if let Err(e) = self.get(warm_up, &RequestProfile::html()).await {
                warn!(url = warm_up, error = %e, "warm-up request failed, continuing");
            }
        }
        self.get(&request.url, &request.profile).await
    }
}
