use crate::cmd::{build_aggregator, print_json};
use anyhow::Result;
use clap::Args;
use judge_stats_libs::{Platform, PlatformHandle};

#[derive(Debug, Args)]
pub struct ProfileArgs {
    #[arg(long)]
    codeforces: Option<String>,
    #[arg(long)]
    leetcode: Option<String>,
    #[arg(long)]
    hackerrank: Option<String>,
}

impl ProfileArgs {
    fn handles(&self) -> Vec<PlatformHandle> {
        [
            (Platform::Codeforces, &self.codeforces),
            (Platform::LeetCode, &self.leetcode),
            (Platform::HackerRank, &self.hackerrank),
        ]
        .into_iter()
        .filter_map(|(platform, handle)| {
            handle
                .as_deref()
                .map(|handle| PlatformHandle::new(platform, handle))
        })
        .collect()
    }
}

pub async fn run(args: ProfileArgs) -> Result<()> {
    let handles = args.handles();
    if handles.iter().all(|handle| !handle.is_configured()) {
        let message = "at least one platform handle must be given";
        tracing::error!(message);
        anyhow::bail!(message)
    }

    let aggregator = build_aggregator()?;
    let summary = aggregator.fetch_profile(&handles).await;

    print_json(&summary)
}
