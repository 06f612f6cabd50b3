use crate::{
    clist::ClistClient,
    config::Config,
    error::{Result, StatsError},
    http::{HttpFetch, ReqwestFetcher},
    model::{
        NormalizedPlatformStats, Platform, PlatformHandle, PlatformStats, ProfileSummary,
        UpcomingContest,
    },
    platforms::{
        codeforces::CodeforcesFetcher, hackerrank::HackerRankFetcher, leetcode::LeetCodeFetcher,
        StatsSource,
    },
    rate_limit::RateLimiter,
};
use futures::future::join_all;
use std::{collections::BTreeMap, sync::Arc};

/// Entry point for fetching judge statistics of any supported platform.
///
/// Cloning is cheap and every clone shares the same LeetCode rate limiter.
#[derive(Clone)]
pub struct StatsAggregator {
    sources: BTreeMap<Platform, Arc<dyn StatsSource>>,
    codeforces: Arc<CodeforcesFetcher>,
    clist: Arc<ClistClient>,
    limiter: Arc<RateLimiter>,
}

impl StatsAggregator {
    pub fn new(config: &Config) -> Result<Self> {
        let http: Arc<dyn HttpFetch> = Arc::new(ReqwestFetcher::new(config.timeout)?);
        let limiter = Arc::new(RateLimiter::with_allowance(config.leetcode_allowance));

        Ok(Self::with_parts(config, http, limiter))
    }

    pub fn with_parts(config: &Config, http: Arc<dyn HttpFetch>, limiter: Arc<RateLimiter>) -> Self {
        let endpoints = &config.endpoints;
        let codeforces = Arc::new(CodeforcesFetcher::new(
            endpoints.codeforces.clone(),
            http.clone(),
        ));
        let leetcode = Arc::new(LeetCodeFetcher::new(
            endpoints.leetcode.clone(),
            http.clone(),
            limiter.clone(),
        ));
        let hackerrank = Arc::new(HackerRankFetcher::new(
            endpoints.hackerrank.clone(),
            http.clone(),
        ));
        let clist = Arc::new(ClistClient::new(
            endpoints.clist.clone(),
            config.clist.clone(),
            http,
        ));

        let mut sources: BTreeMap<Platform, Arc<dyn StatsSource>> = BTreeMap::new();
        sources.insert(Platform::Codeforces, codeforces.clone());
        sources.insert(Platform::LeetCode, leetcode);
        sources.insert(Platform::HackerRank, hackerrank);

        Self {
            sources,
            codeforces,
            clist,
            limiter,
        }
    }

    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    pub fn clist(&self) -> &ClistClient {
        &self.clist
    }

    pub async fn try_fetch_stats(&self, platform: Platform, handle: &str) -> Result<PlatformStats> {
        let handle = handle.trim();
        if handle.is_empty() {
            return Err(StatsError::InvalidHandle(handle.to_string()));
        }

        let source = self
            .sources
            .get(&platform)
            .ok_or_else(|| StatsError::upstream(format!("{} is not available", platform)))?;

        tracing::info!("Start to fetch {} stats of {}.", platform, handle);
        source.fetch_stats(handle).await
    }

    /// Fetch one platform's statistics. Failures are reported in the `error` field of the record.
    pub async fn fetch_stats(&self, platform: Platform, handle: &str) -> NormalizedPlatformStats {
        let outcome = self.try_fetch_stats(platform, handle).await;
        match &outcome {
            Err(e) => match e.resume_after() {
                Some(reset_at) => tracing::warn!(
                    "{} rate limited while fetching {}. Retry after {}.",
                    platform,
                    handle,
                    reset_at
                ),
                None => tracing::warn!("failed to fetch {} stats of {}: {}", platform, handle, e),
            },
            Ok(_) => {}
        }

        NormalizedPlatformStats::from_outcome(handle.trim(), &outcome)
    }

    /// Fetch every configured handle concurrently and merge the results.
    pub async fn fetch_profile(&self, handles: &[PlatformHandle]) -> ProfileSummary {
        let targets: Vec<&PlatformHandle> = handles
            .iter()
            .filter(|handle| {
                if !handle.is_configured() {
                    tracing::debug!("{} is not configured. Skipped.", handle.platform);
                }
                handle.is_configured()
            })
            .collect();

        let results = join_all(targets.iter().map(|target| async move {
            let stats = self.fetch_stats(target.platform, &target.handle).await;
            (target.platform, stats)
        }))
        .await;

        ProfileSummary::merge(results.into_iter().collect())
    }

    pub async fn upcoming_contests(&self) -> Vec<UpcomingContest> {
        self.codeforces.fetch_upcoming_contests().await
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        http::testing::ScriptedFetcher,
        rate_limit::{testing::ManualClock, Clock},
    };
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use serde_json::json;

    fn epoch() -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000, 0).unwrap()
    }

    fn aggregator(
        script: ScriptedFetcher,
        allowance: u32,
    ) -> (Arc<ScriptedFetcher>, Arc<ManualClock>, StatsAggregator) {
        let script = Arc::new(script);
        let clock = Arc::new(ManualClock::new(epoch()));
        let limiter = Arc::new(RateLimiter::new(
            allowance,
            Duration::seconds(60),
            clock.clone(),
        ));
        let aggregator = StatsAggregator::with_parts(&Config::default(), script.clone(), limiter);
        (script, clock, aggregator)
    }

    fn codeforces(script: ScriptedFetcher) -> ScriptedFetcher {
        script
            .json(
                "https://codeforces.com/api/user.info",
                200,
                json!({"status": "OK", "result": [{"handle": "tourist", "rating": 3800}]}),
            )
            .json(
                "https://codeforces.com/api/user.status",
                200,
                json!({"status": "OK", "result": [
                    {"verdict": "OK", "problem": {"contestId": 1, "index": "A"}},
                    {"verdict": "OK", "problem": {"contestId": 1, "index": "B"}},
                ]}),
            )
            .json(
                "https://codeforces.com/api/user.rating",
                200,
                json!({"status": "OK", "result": [{"contestId": 1}]}),
            )
    }

    fn leetcode(script: ScriptedFetcher) -> ScriptedFetcher {
        script
            .json(
                "https://alfa-leetcode-api.onrender.com/tourist/solved",
                200,
                json!({"solvedProblem": 40}),
            )
            .json(
                "https://alfa-leetcode-api.onrender.com/tourist/contest",
                200,
                json!({"contestAttend": 1}),
            )
            .json(
                "https://alfa-leetcode-api.onrender.com/tourist",
                200,
                json!({"username": "tourist"}),
            )
    }

    #[tokio::test]
    async fn test_empty_handle_is_rejected_without_request() {
        let (script, _, aggregator) = aggregator(ScriptedFetcher::new(), 10);

        let record = aggregator.fetch_stats(Platform::Codeforces, "   ").await;

        assert!(!record.is_ok());
        assert_eq!(record.total_solved, 0);
        assert_eq!(script.request_count(), 0);
    }

    #[tokio::test]
    async fn test_fetch_stats_reports_error_record() {
        let (_, _, aggregator) = aggregator(
            ScriptedFetcher::new().json(
                "https://www.hackerrank.com/rest/hackers/ghost",
                200,
                json!({}),
            ),
            10,
        );

        let record = aggregator.fetch_stats(Platform::HackerRank, "ghost").await;

        assert_eq!(
            record,
            NormalizedPlatformStats::failed("ghost", &StatsError::NotFound(String::from("ghost")))
        );
    }

    #[tokio::test]
    async fn test_fetch_profile_isolates_failures() {
        let script = leetcode(codeforces(ScriptedFetcher::new())).on(
            "https://www.hackerrank.com/",
            Err(StatsError::upstream("connection refused")),
        );
        let (_, _, aggregator) = aggregator(script, 10);

        let summary = aggregator
            .fetch_profile(&[
                PlatformHandle::new(Platform::Codeforces, "tourist"),
                PlatformHandle::new(Platform::LeetCode, "tourist"),
                PlatformHandle::new(Platform::HackerRank, "tourist"),
            ])
            .await;

        assert_eq!(summary.platforms.len(), 3);
        assert_eq!(summary.platforms[&Platform::Codeforces].total_solved, 2);
        assert_eq!(summary.platforms[&Platform::LeetCode].total_solved, 40);
        assert!(!summary.platforms[&Platform::HackerRank].is_ok());
        assert_eq!(summary.total_solved, 42);
        assert_eq!(summary.achievement_score, 420);
    }

    #[tokio::test]
    async fn test_fetch_profile_saturates_huge_totals() {
        let script = codeforces(ScriptedFetcher::new()).json(
            "https://www.hackerrank.com/",
            200,
            json!({"models": [], "total": 2_000_000_000_000_000_000u64}),
        );
        let (_, _, aggregator) = aggregator(script, 10);

        let summary = aggregator
            .fetch_profile(&[
                PlatformHandle::new(Platform::Codeforces, "tourist"),
                PlatformHandle::new(Platform::HackerRank, "tourist"),
            ])
            .await;

        assert_eq!(summary.total_solved, 2_000_000_000_000_000_002);
        assert_eq!(summary.achievement_score, u64::MAX);
        assert_eq!(
            summary.profile_urls[&Platform::Codeforces],
            "https://codeforces.com/profile/tourist"
        );
    }

    #[tokio::test]
    async fn test_rate_limited_record_carries_reset() {
        let mut res = crate::http::RawResponse::new(reqwest::StatusCode::TOO_MANY_REQUESTS, "");
        res.headers.insert(
            "retry-after",
            reqwest::header::HeaderValue::from_static("30"),
        );
        let (_, _, aggregator) = aggregator(
            ScriptedFetcher::new().on("https://alfa-leetcode-api.onrender.com/", Ok(res)),
            10,
        );

        let record = aggregator.fetch_stats(Platform::LeetCode, "neal").await;

        assert_eq!(
            record.error,
            Some(StatsError::RateLimited(epoch() + Duration::seconds(30)).to_string())
        );
    }

    #[tokio::test]
    async fn test_fetch_profile_skips_unconfigured_handles() {
        let (script, _, aggregator) = aggregator(codeforces(ScriptedFetcher::new()), 10);

        let summary = aggregator
            .fetch_profile(&[
                PlatformHandle::new(Platform::Codeforces, "tourist"),
                PlatformHandle::new(Platform::LeetCode, ""),
            ])
            .await;

        assert_eq!(summary.platforms.len(), 1);
        assert_eq!(script.request_count(), 3);
    }

    #[tokio::test]
    async fn test_concurrent_leetcode_calls_share_allowance() {
        let (_, clock, aggregator) = aggregator(leetcode(ScriptedFetcher::new()), 1);
        let other = aggregator.clone();

        let (first, second) = tokio::join!(
            async {
                let stats = aggregator.fetch_stats(Platform::LeetCode, "tourist").await;
                (stats, clock.now())
            },
            async {
                let stats = other.fetch_stats(Platform::LeetCode, "tourist").await;
                (stats, clock.now())
            }
        );

        assert!(first.0.is_ok());
        assert!(second.0.is_ok());
        // 片方は次のウィンドウまで待たされる
        assert_eq!(first.1.min(second.1), epoch());
        assert_eq!(first.1.max(second.1), epoch() + Duration::seconds(60));
    }
}
