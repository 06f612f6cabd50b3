use crate::{
    error::{Result, StatsError},
    http::{HttpFetch, RawResponse},
    model::{Platform, PlatformStats},
    platforms::{endpoint, StatsSource},
};
use async_trait::async_trait;
use reqwest::{header::HeaderMap, StatusCode, Url};
use serde::{de::IgnoredAny, Deserialize};
use std::sync::Arc;

const RECENT_CHALLENGES_LIMIT: &str = "100";

#[derive(Debug, Clone, Deserialize)]
pub struct RecentChallenges {
    pub models: Option<Vec<IgnoredAny>>,
    pub total: Option<u64>,
}

/// Decode a recent challenges response. A body without the challenge list or the total means the hacker does not exist.
pub fn decode(res: &RawResponse, handle: &str) -> Result<PlatformStats> {
    match res.status {
        StatusCode::NOT_FOUND => return Err(StatsError::NotFound(handle.to_string())),
        status if !status.is_success() => {
            return Err(StatsError::UpstreamUnavailable(format!(
                "unexpected status [{}] from HackerRank",
                status
            )))
        }
        _ => {}
    }

    let body: RecentChallenges = res.json()?;
    match (body.models, body.total) {
        (Some(_), Some(total)) => {
            let mut stats = PlatformStats::new(handle);
            stats.total_solved = total;
            Ok(stats)
        }
        _ => Err(StatsError::NotFound(handle.to_string())),
    }
}

pub struct HackerRankFetcher {
    base: Url,
    http: Arc<dyn HttpFetch>,
}

impl HackerRankFetcher {
    pub fn new(base: Url, http: Arc<dyn HttpFetch>) -> Self {
        Self { base, http }
    }
}

#[async_trait]
impl StatsSource for HackerRankFetcher {
    fn platform(&self) -> Platform {
        Platform::HackerRank
    }

    async fn fetch_stats(&self, handle: &str) -> Result<PlatformStats> {
        let mut url = endpoint(
            &self.base,
            &["rest", "hackers", handle, "recent_challenges"],
        )?;
        url.query_pairs_mut()
            .append_pair("limit", RECENT_CHALLENGES_LIMIT);

        let res = self.http.get(url, HeaderMap::new()).await?;
        let stats = decode(&res, handle)?;
        tracing::info!(
            "HackerRank user {} completed {} challenges.",
            handle,
            stats.total_solved
        );

        Ok(stats)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::http::testing::ScriptedFetcher;
    use serde_json::json;

    fn response(body: serde_json::Value) -> RawResponse {
        RawResponse::new(StatusCode::OK, body.to_string())
    }

    #[test]
    fn test_decode_missing_models_and_total() {
        let res = response(json!({"cursor": null}));

        assert_eq!(
            decode(&res, "ghost"),
            Err(StatsError::NotFound(String::from("ghost")))
        );
    }

    #[test]
    fn test_decode_missing_total() {
        let res = response(json!({"models": [{"name": "Solve Me First"}]}));

        assert_eq!(
            decode(&res, "ghost"),
            Err(StatsError::NotFound(String::from("ghost")))
        );
    }

    #[test]
    fn test_decode_zero_total_is_success() {
        let res = response(json!({"models": [], "total": 0}));

        assert_eq!(decode(&res, "fresh"), Ok(PlatformStats::new("fresh")));
    }

    #[test]
    fn test_decode_missing_hacker_status() {
        let res = RawResponse::new(StatusCode::NOT_FOUND, "");

        assert_eq!(
            decode(&res, "ghost"),
            Err(StatsError::NotFound(String::from("ghost")))
        );
    }

    #[tokio::test]
    async fn test_fetch_stats() {
        let script = Arc::new(ScriptedFetcher::new().json(
            "https://www.hackerrank.com/rest/hackers/",
            200,
            json!({"models": [{"name": "Solve Me First", "ch_slug": "solve-me-first"}], "total": 57}),
        ));
        let fetcher = HackerRankFetcher::new(
            Url::parse("https://www.hackerrank.com/").unwrap(),
            script.clone(),
        );

        let stats = fetcher.fetch_stats("alice").await.unwrap();

        assert_eq!(stats.total_solved, 57);
        assert_eq!(stats.rating, 0);
        assert_eq!(stats.rank, "unrated");
        assert_eq!(
            script.requests()[0].0.as_str(),
            "https://www.hackerrank.com/rest/hackers/alice/recent_challenges?limit=100"
        );
    }
}
