use crate::{
    error::{Result, StatsError},
    http::{HttpFetch, RawResponse},
    model::{Platform, PlatformStats, UpcomingContest, UNRATED},
    platforms::{endpoint, StatsSource},
};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use itertools::Itertools;
use reqwest::{header::HeaderMap, StatusCode, Url};
use serde::{
    de::{DeserializeOwned, IgnoredAny},
    Deserialize,
};
use std::sync::Arc;

const ACCEPTED: &str = "OK";
const UPCOMING_CONTEST_LIMIT: usize = 10;

#[derive(Debug, Deserialize)]
pub struct CodeforcesResponse<T> {
    pub status: String,
    pub comment: Option<String>,
    pub result: Option<T>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeforcesUser {
    pub handle: String,
    pub rating: Option<i64>,
    pub max_rating: Option<i64>,
    pub rank: Option<String>,
    pub max_rank: Option<String>,
    pub contribution: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Submission {
    pub verdict: Option<String>,
    pub problem: SubmissionProblem,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionProblem {
    pub contest_id: Option<i64>,
    pub index: Option<String>,
}

/// One entry of `user.rating`. Only the number of entries is used.
pub type RatingChange = IgnoredAny;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeforcesContest {
    pub id: i64,
    pub name: String,
    pub phase: String,
    pub duration_seconds: i64,
    pub start_time_seconds: Option<i64>,
}

/// Count distinct problems with an accepted verdict.
///
/// A problem is identified by the pair of its contest id and index. A missing contest id is kept as part of the key.
pub fn count_solved(submissions: &[Submission]) -> u64 {
    submissions
        .iter()
        .filter(|submission| submission.verdict.as_deref() == Some(ACCEPTED))
        .map(|submission| (submission.problem.contest_id, submission.problem.index.as_deref()))
        .unique()
        .count() as u64
}

pub fn normalize(
    user: &CodeforcesUser,
    submissions: &[Submission],
    ratings: &[RatingChange],
) -> PlatformStats {
    PlatformStats {
        username: user.handle.clone(),
        total_solved: count_solved(submissions),
        rating: user.rating.unwrap_or(0),
        max_rating: user.max_rating.unwrap_or(0),
        rank: user.rank.clone().unwrap_or_else(|| String::from(UNRATED)),
        max_rank: user
            .max_rank
            .clone()
            .unwrap_or_else(|| String::from(UNRATED)),
        contests: ratings.len() as u64,
        contribution: user.contribution.unwrap_or(0),
    }
}

/// Decode the `result` of a Codeforces API response.
///
/// Codeforces answers 400 with a `FAILED` body both for handles that do not exist and for malformed ones.
pub fn decode<T: DeserializeOwned>(res: &RawResponse, handle: &str) -> Result<T> {
    if res.status == StatusCode::BAD_REQUEST {
        let comment = res
            .json::<CodeforcesResponse<serde_json::Value>>()
            .ok()
            .and_then(|body| body.comment)
            .unwrap_or_default();

        return if comment.contains("not found") {
            Err(StatsError::NotFound(handle.to_string()))
        } else {
            Err(StatsError::InvalidHandle(handle.to_string()))
        };
    }

    if !res.status.is_success() {
        return Err(StatsError::UpstreamUnavailable(format!(
            "unexpected status [{}] from Codeforces",
            res.status
        )));
    }

    let body: CodeforcesResponse<T> = res.json()?;
    if body.status != "OK" {
        return Err(StatsError::UpstreamUnavailable(format!(
            "Codeforces API failed cause [{}]",
            body.comment.unwrap_or_default()
        )));
    }

    body.result
        .ok_or_else(|| StatsError::upstream("Codeforces response has no result"))
}

pub fn decode_user(res: &RawResponse, handle: &str) -> Result<CodeforcesUser> {
    decode::<Vec<CodeforcesUser>>(res, handle)?
        .into_iter()
        .next()
        .ok_or_else(|| StatsError::NotFound(handle.to_string()))
}

pub fn upcoming_contests(contests: Vec<CodeforcesContest>) -> Vec<UpcomingContest> {
    contests
        .into_iter()
        .filter(|contest| contest.phase == "BEFORE" || contest.phase == "CODING")
        .filter_map(|contest| {
            let Some(start_seconds) = contest.start_time_seconds else {
                tracing::warn!("contest {} has no start time. Skipped.", contest.id);
                return None;
            };
            let start: DateTime<Utc> = Utc.timestamp_opt(start_seconds, 0).single()?;
            let end: DateTime<Utc> = Utc
                .timestamp_opt(start_seconds + contest.duration_seconds, 0)
                .single()?;

            Some(UpcomingContest {
                id: contest.id.to_string(),
                title: contest.name,
                platform: String::from("Codeforces"),
                start,
                end,
                duration_seconds: contest.duration_seconds,
                url: format!("https://codeforces.com/contest/{}", contest.id),
                phase: contest.phase,
            })
        })
        .take(UPCOMING_CONTEST_LIMIT)
        .collect()
}

pub struct CodeforcesFetcher {
    base: Url,
    http: Arc<dyn HttpFetch>,
}

impl CodeforcesFetcher {
    pub fn new(base: Url, http: Arc<dyn HttpFetch>) -> Self {
        Self { base, http }
    }

    async fn get(&self, method: &str, params: &[(&str, &str)]) -> Result<RawResponse> {
        let mut url = endpoint(&self.base, &[method])?;
        if !params.is_empty() {
            url.query_pairs_mut().extend_pairs(params);
        }

        self.http.get(url, HeaderMap::new()).await
    }

    pub async fn fetch_user(&self, handle: &str) -> Result<CodeforcesUser> {
        let res = self.get("user.info", &[("handles", handle)]).await?;
        decode_user(&res, handle)
    }

    pub async fn fetch_submissions(&self, handle: &str) -> Result<Vec<Submission>> {
        let res = self.get("user.status", &[("handle", handle)]).await?;
        decode(&res, handle)
    }

    pub async fn fetch_rating_history(&self, handle: &str) -> Result<Vec<RatingChange>> {
        let res = self.get("user.rating", &[("handle", handle)]).await?;
        decode(&res, handle)
    }

    /// Contests that have not finished yet. Failures are logged and yield an empty list.
    pub async fn fetch_upcoming_contests(&self) -> Vec<UpcomingContest> {
        tracing::info!("Start to retrieve contest list from Codeforces");
        let contests = match self.get("contest.list", &[]).await {
            Ok(res) => decode::<Vec<CodeforcesContest>>(&res, ""),
            Err(e) => Err(e),
        };

        match contests {
            Ok(contests) => {
                let upcoming = upcoming_contests(contests);
                tracing::info!("{} upcoming contests retrieved.", upcoming.len());
                upcoming
            }
            Err(e) => {
                tracing::error!("failed to fetch contest list from Codeforces: {}", e);
                Vec::new()
            }
        }
    }
}

#[async_trait]
impl StatsSource for CodeforcesFetcher {
    fn platform(&self) -> Platform {
        Platform::Codeforces
    }

    async fn fetch_stats(&self, handle: &str) -> Result<PlatformStats> {
        // user.infoは`;`区切りで複数ユーザーを受け付ける
        if handle.contains(';') {
            return Err(StatsError::InvalidHandle(handle.to_string()));
        }

        let user = self.fetch_user(handle).await?;
        let submissions = self.fetch_submissions(handle).await?;
        let ratings = self.fetch_rating_history(handle).await?;

        let stats = normalize(&user, &submissions, &ratings);
        tracing::info!(
            "Codeforces user {} solved {} problems in {} contests.",
            stats.username,
            stats.total_solved,
            stats.contests
        );

        Ok(stats)
    }
}
