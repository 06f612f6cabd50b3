use crate::error::{Result, StatsError};
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{header::HeaderMap, Client, StatusCode, Url};
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Response of an outbound GET request, read fully into memory.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl RawResponse {
    pub fn new(status: StatusCode, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: body.into(),
        }
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_slice(&self.body)?)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }

    pub fn error_for_status(&self, url: &Url) -> Result<()> {
        if self.status.is_success() {
            Ok(())
        } else {
            Err(StatsError::UpstreamUnavailable(format!(
                "unexpected status [{}] from {}",
                self.status,
                url.as_str()
            )))
        }
    }
}

#[async_trait]
pub trait HttpFetch: Send + Sync {
    /// Only transport failures are errors; any HTTP status is returned as a response.
    async fn get(&self, url: Url, headers: HeaderMap) -> Result<RawResponse>;
}

pub struct ReqwestFetcher {
    client: Client,
}

impl ReqwestFetcher {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .gzip(true)
            .timeout(timeout)
            .user_agent(concat!("judge_stats/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { client })
    }
}

#[async_trait]
impl HttpFetch for ReqwestFetcher {
    async fn get(&self, url: Url, headers: HeaderMap) -> Result<RawResponse> {
        tracing::debug!("GET {}", url);
        let res = self.client.get(url).headers(headers).send().await?;

        let status = res.status();
        let headers = res.headers().clone();
        let body = res.bytes().await?;

        Ok(RawResponse {
            status,
            headers,
            body,
        })
    }
}
