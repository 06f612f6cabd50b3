use crate::{
    error::{Result, StatsError},
    http::{HttpFetch, RawResponse},
    model::{Platform, PlatformStats, UNRATED},
    platforms::{endpoint, StatsSource},
    rate_limit::RateLimiter,
};
use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use reqwest::{header::HeaderMap, StatusCode, Url};
use serde::{de::DeserializeOwned, Deserialize};
use std::sync::Arc;

pub const RATE_LIMIT_RESET_HEADER: &str = "x-ratelimit-reset";
pub const RETRY_AFTER_HEADER: &str = "retry-after";

#[derive(Debug, Clone, Deserialize)]
pub struct LeetCodeProfile {
    pub username: Option<String>,
    pub errors: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeetCodeSolved {
    pub solved_problem: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Ranking {
    Number(i64),
    Text(String),
}

impl Ranking {
    fn label(&self) -> String {
        match self {
            Ranking::Number(rank) => rank.to_string(),
            Ranking::Text(rank) => rank.clone(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeetCodeContest {
    #[serde(alias = "rating")]
    pub contest_rating: Option<f64>,
    #[serde(alias = "ranking")]
    pub contest_global_ranking: Option<Ranking>,
    #[serde(alias = "contestParticipation")]
    pub contest_attend: Option<u64>,
}

pub fn normalize(
    handle: &str,
    profile: &LeetCodeProfile,
    solved: &LeetCodeSolved,
    contest: &LeetCodeContest,
) -> PlatformStats {
    let rating = contest.contest_rating.map(|r| r.round() as i64).unwrap_or(0);
    let rank = contest
        .contest_global_ranking
        .as_ref()
        .map(Ranking::label)
        .filter(|rank| !rank.is_empty())
        .unwrap_or_else(|| String::from(UNRATED));

    PlatformStats {
        username: profile
            .username
            .clone()
            .unwrap_or_else(|| handle.to_string()),
        total_solved: solved.solved_problem.unwrap_or(0),
        rating,
        max_rating: rating,
        rank: rank.clone(),
        max_rank: rank,
        contests: contest.contest_attend.unwrap_or(0),
        contribution: 0,
    }
}

/// Reset instant announced by a 429 response.
///
/// `x-ratelimit-reset` carries unix seconds and `retry-after` carries a delay in seconds.
/// Without either, or with a delay out of range, the default window is assumed.
pub fn reset_instant(res: &RawResponse, now: DateTime<Utc>, window: Duration) -> DateTime<Utc> {
    if let Some(reset) = res
        .header(RATE_LIMIT_RESET_HEADER)
        .and_then(|value| value.trim().parse::<i64>().ok())
        .and_then(|seconds| Utc.timestamp_opt(seconds, 0).single())
    {
        return reset;
    }

    if let Some(reset) = res
        .header(RETRY_AFTER_HEADER)
        .and_then(|value| value.trim().parse::<i64>().ok())
        .and_then(Duration::try_seconds)
        .and_then(|delay| now.checked_add_signed(delay))
    {
        return reset;
    }

    now + window
}

pub struct LeetCodeFetcher {
    base: Url,
    http: Arc<dyn HttpFetch>,
    limiter: Arc<RateLimiter>,
}

impl LeetCodeFetcher {
    pub fn new(base: Url, http: Arc<dyn HttpFetch>, limiter: Arc<RateLimiter>) -> Self {
        Self {
            base,
            http,
            limiter,
        }
    }

    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    async fn get<T: DeserializeOwned>(&self, handle: &str, segments: &[&str]) -> Result<T> {
        let url = endpoint(&self.base, segments)?;
        let res = self.http.get(url.clone(), HeaderMap::new()).await?;

        match res.status {
            StatusCode::TOO_MANY_REQUESTS => {
                let reset_at = reset_instant(&res, self.limiter.now(), self.limiter.window());
                self.limiter.on_rate_limit_signal(reset_at);
                Err(StatsError::RateLimited(reset_at))
            }
            StatusCode::NOT_FOUND => Err(StatsError::NotFound(handle.to_string())),
            _ => {
                res.error_for_status(&url)?;
                res.json()
            }
        }
    }
}

#[async_trait]
impl StatsSource for LeetCodeFetcher {
    fn platform(&self) -> Platform {
        Platform::LeetCode
    }

    async fn fetch_stats(&self, handle: &str) -> Result<PlatformStats> {
        self.limiter.wait_for_slot().await;

        let profile: LeetCodeProfile = self.get(handle, &[handle]).await?;
        if profile.errors.is_some() {
            return Err(StatsError::NotFound(handle.to_string()));
        }
        let solved: LeetCodeSolved = self.get(handle, &[handle, "solved"]).await?;
        let contest: LeetCodeContest = self.get(handle, &[handle, "contest"]).await?;

        let stats = normalize(handle, &profile, &solved, &contest);
        tracing::info!(
            "LeetCode user {} solved {} problems.",
            stats.username,
            stats.total_solved
        );

        Ok(stats)
    }
}
