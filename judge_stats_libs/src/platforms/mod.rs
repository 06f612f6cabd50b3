pub mod codeforces;
pub mod hackerrank;
pub mod leetcode;

use crate::{
    error::{Result, StatsError},
    model::{Platform, PlatformStats},
};
use async_trait::async_trait;
use reqwest::Url;

/// A judge platform that can produce normalized statistics for a handle.
#[async_trait]
pub trait StatsSource: Send + Sync {
    fn platform(&self) -> Platform;
    async fn fetch_stats(&self, handle: &str) -> Result<PlatformStats>;
}

/// Append percent-encoded path segments to a base url.
pub(crate) fn endpoint(base: &Url, segments: &[&str]) -> Result<Url> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| StatsError::upstream(format!("cannot be a base url: {}", base)))?
        .pop_if_empty()
        .extend(segments);

    Ok(url)
}
