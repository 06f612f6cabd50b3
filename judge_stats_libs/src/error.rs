use chrono::{DateTime, Utc};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, StatsError>;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StatsError {
    #[error("user `{0}` not found")]
    NotFound(String),
    #[error("invalid handle `{0}`")]
    InvalidHandle(String),
    #[error("rate limit exceeded, resets at {0}")]
    RateLimited(DateTime<Utc>),
    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(String),
}

impl StatsError {
    pub fn upstream(message: impl Into<String>) -> Self {
        StatsError::UpstreamUnavailable(message.into())
    }

    /// The instant after which a rate limited call may be retried.
    pub fn resume_after(&self) -> Option<DateTime<Utc>> {
        match self {
            StatsError::RateLimited(reset_at) => Some(*reset_at),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for StatsError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            StatsError::UpstreamUnavailable(String::from("request timed out"))
        } else {
            StatsError::UpstreamUnavailable(format!("failed to request: {}", e))
        }
    }
}

impl From<serde_json::Error> for StatsError {
    fn from(e: serde_json::Error) -> Self {
        StatsError::UpstreamUnavailable(format!("failed to deserialize JSON data: {}", e))
    }
}
