pub mod clist;
pub mod contests;
pub mod profile;
pub mod stats;

use anyhow::{Context, Result};
use judge_stats_libs::{Config, StatsAggregator};
use serde::Serialize;

pub fn build_aggregator() -> Result<StatsAggregator> {
    let config = Config::from_env()?;
    StatsAggregator::new(&config).with_context(|| {
        let message = "Failed to create HTTP client";
        tracing::error!(message);
        message
    })
}

pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("failed to serialize result")?;
    println!("{}", json);
    Ok(())
}
