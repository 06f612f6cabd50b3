use crate::{
    config::ClistCredentials,
    error::{Result, StatsError},
    http::HttpFetch,
    platforms::endpoint,
};
use reqwest::{
    header::{HeaderMap, HeaderValue, AUTHORIZATION},
    StatusCode, Url,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ClistMeta {
    pub limit: Option<u64>,
    pub offset: Option<u64>,
    #[serde(alias = "total_count")]
    pub total_count: Option<u64>,
    pub next: Option<String>,
    pub previous: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClistListing<T> {
    #[serde(default)]
    pub meta: ClistMeta,
    pub objects: Vec<T>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClistContest {
    pub id: i64,
    pub resource: Option<String>,
    pub event: String,
    pub start: String,
    pub end: String,
    pub duration: Option<i64>,
    pub href: Option<String>,
}

/// Read-only client of the clist.by contest aggregator API.
pub struct ClistClient {
    base: Url,
    credentials: Option<ClistCredentials>,
    http: Arc<dyn HttpFetch>,
}

impl ClistClient {
    pub fn new(base: Url, credentials: Option<ClistCredentials>, http: Arc<dyn HttpFetch>) -> Self {
        Self {
            base,
            credentials,
            http,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.credentials.is_some()
    }

    fn authorized(&self, segments: &[&str]) -> Result<(Url, HeaderMap)> {
        let credentials = self.credentials.as_ref().ok_or_else(|| {
            let message = "contest aggregator credentials are not configured";
            tracing::error!(message);
            StatsError::upstream(message)
        })?;

        // clistのAPIは末尾のスラッシュが必要
        let mut segments = segments.to_vec();
        segments.push("");
        let mut url = endpoint(&self.base, &segments)?;
        url.query_pairs_mut()
            .append_pair("username", &credentials.username);

        let mut headers = HeaderMap::new();
        let authorization = HeaderValue::from_str(&credentials.authorization())
            .map_err(|e| StatsError::upstream(format!("invalid authorization header: {}", e)))?;
        headers.insert(AUTHORIZATION, authorization);

        Ok((url, headers))
    }

    async fn get<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T> {
        let (url, headers) = self.authorized(segments)?;

        let result = match self.http.get(url.clone(), headers).await {
            Ok(res) => res.error_for_status(&url).and_then(|_| res.json::<T>()),
            Err(e) => Err(e),
        };

        result.map_err(|e| {
            tracing::error!("error fetching {} from contest aggregator: {}", url.path(), e);
            match e {
                StatsError::UpstreamUnavailable(_) => e,
                other => StatsError::upstream(other.to_string()),
            }
        })
    }

    pub async fn contests(&self) -> Result<ClistListing<ClistContest>> {
        self.get(&["contest"]).await
    }

    pub async fn contest(&self, id: &str) -> Result<ClistContest> {
        self.get(&["contest", id]).await
    }

    pub async fn coder(&self, id: &str) -> Result<Value> {
        self.get(&["coder", id]).await
    }

    pub async fn my_profile(&self) -> Result<Value> {
        self.get(&["coder", "me"]).await
    }

    pub async fn resources(&self) -> Result<ClistListing<Value>> {
        self.get(&["resource"]).await
    }

    pub async fn problems(&self) -> Result<ClistListing<Value>> {
        self.get(&["problem"]).await
    }

    pub async fn statistics(&self) -> Result<ClistListing<Value>> {
        self.get(&["statistics"]).await
    }

    /// Whether the contest listing answers with 200.
    pub async fn test_connection(&self) -> Result<bool> {
        let (url, headers) = self.authorized(&["contest"])?;

        let res = self.http.get(url, headers).await.map_err(|e| {
            tracing::error!("contest aggregator connection failed: {}", e);
            e
        })?;

        Ok(res.status == StatusCode::OK)
    }
}
