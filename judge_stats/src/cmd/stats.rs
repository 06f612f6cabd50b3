use crate::cmd::{build_aggregator, print_json};
use anyhow::Result;
use clap::Args;
use judge_stats_libs::Platform;

#[derive(Debug, Args)]
pub struct StatsArgs {
    platform: Platform,
    handle: String,
}

pub async fn run(args: StatsArgs) -> Result<()> {
    let aggregator = build_aggregator()?;
    let stats = aggregator.fetch_stats(args.platform, &args.handle).await;

    print_json(&stats)
}
