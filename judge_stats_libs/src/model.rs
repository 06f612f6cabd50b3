use crate::error::StatsError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fmt, str::FromStr};
use thiserror::Error;

pub const UNRATED: &str = "unrated";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Codeforces,
    LeetCode,
    HackerRank,
}

impl Platform {
    pub fn profile_url(&self, handle: &str) -> String {
        match self {
            Platform::Codeforces => format!("https://codeforces.com/profile/{}", handle),
            Platform::LeetCode => format!("https://leetcode.com/{}", handle),
            Platform::HackerRank => format!("https://hackerrank.com/{}", handle),
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Platform::Codeforces => write!(f, "codeforces"),
            Platform::LeetCode => write!(f, "leetcode"),
            Platform::HackerRank => write!(f, "hackerrank"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unsupported platform `{0}`")]
pub struct UnsupportedPlatform(pub String);

impl FromStr for Platform {
    type Err = UnsupportedPlatform;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "codeforces" => Ok(Platform::Codeforces),
            "leetcode" => Ok(Platform::LeetCode),
            "hackerrank" => Ok(Platform::HackerRank),
            _ => Err(UnsupportedPlatform(s.to_string())),
        }
    }
}

/// A handle a user registered for one platform. An empty handle means the platform is not configured.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformHandle {
    pub platform: Platform,
    pub handle: String,
}

impl PlatformHandle {
    pub fn new(platform: Platform, handle: &str) -> Self {
        Self {
            platform,
            handle: handle.to_string(),
        }
    }

    pub fn is_configured(&self) -> bool {
        !self.handle.trim().is_empty()
    }
}

/// Successfully normalized statistics of one platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformStats {
    pub username: String,
    pub total_solved: u64,
    pub rating: i64,
    pub max_rating: i64,
    pub rank: String,
    pub max_rank: String,
    pub contests: u64,
    pub contribution: i64,
}

impl PlatformStats {
    pub fn new(username: &str) -> Self {
        Self {
            username: username.to_string(),
            total_solved: 0,
            rating: 0,
            max_rating: 0,
            rank: String::from(UNRATED),
            max_rank: String::from(UNRATED),
            contests: 0,
            contribution: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedPlatformStats {
    pub username: String,
    pub total_solved: u64,
    pub rating: i64,
    pub max_rating: i64,
    pub rank: String,
    pub max_rank: String,
    pub contests: u64,
    pub contribution: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl NormalizedPlatformStats {
    pub fn failed(username: &str, error: &StatsError) -> Self {
        let PlatformStats {
            username,
            total_solved,
            rating,
            max_rating,
            rank,
            max_rank,
            contests,
            contribution,
        } = PlatformStats::new(username);

        Self {
            username,
            total_solved,
            rating,
            max_rating,
            rank,
            max_rank,
            contests,
            contribution,
            error: Some(error.to_string()),
        }
    }

    pub fn from_outcome(username: &str, outcome: &Result<PlatformStats, StatsError>) -> Self {
        match outcome {
            Ok(stats) => Self::from(stats.clone()),
            Err(e) => Self::failed(username, e),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

impl From<PlatformStats> for NormalizedPlatformStats {
    fn from(stats: PlatformStats) -> Self {
        Self {
            username: stats.username,
            total_solved: stats.total_solved,
            rating: stats.rating,
            max_rating: stats.max_rating,
            rank: stats.rank,
            max_rank: stats.max_rank,
            contests: stats.contests,
            contribution: stats.contribution,
            error: None,
        }
    }
}

/// Statistics of every configured platform of a user merged into one view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileSummary {
    pub platforms: BTreeMap<Platform, NormalizedPlatformStats>,
    pub profile_urls: BTreeMap<Platform, String>,
    pub total_solved: u64,
    pub achievement_score: u64,
}

impl ProfileSummary {
    /// Merge per-platform records. Totals saturate instead of overflowing on absurd upstream counts.
    pub fn merge(platforms: BTreeMap<Platform, NormalizedPlatformStats>) -> Self {
        // 取得に失敗したプラットフォームは合計に含めない
        let total_solved = platforms
            .values()
            .filter(|stats| stats.is_ok())
            .fold(0u64, |total, stats| total.saturating_add(stats.total_solved));

        let profile_urls = platforms
            .iter()
            .map(|(platform, stats)| (*platform, platform.profile_url(&stats.username)))
            .collect();

        Self {
            platforms,
            profile_urls,
            total_solved,
            achievement_score: total_solved.saturating_mul(10),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpcomingContest {
    pub id: String,
    pub title: String,
    pub platform: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub duration_seconds: i64,
    pub url: String,
    pub phase: String,
}
