use crate::cmd::{build_aggregator, print_json};
use anyhow::Result;
use clap::Args;

#[derive(Debug, Args)]
pub struct ContestsArgs {}

pub async fn run(_args: ContestsArgs) -> Result<()> {
    let aggregator = build_aggregator()?;
    let contests = aggregator.upcoming_contests().await;

    print_json(&contests)
}
