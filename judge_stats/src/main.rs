mod cmd;

use crate::cmd::{
    clist::{self, ClistArgs},
    contests::{self, ContestsArgs},
    profile::{self, ProfileArgs},
    stats::{self, StatsArgs},
};
use clap::{Parser, Subcommand};
use dotenvy::dotenv;
use std::{env, str::FromStr};
use tokio::runtime::Builder;
use tracing_subscriber::{
    filter::{EnvFilter, LevelFilter},
    fmt::{self, time::OffsetTime},
};

#[derive(Debug, Parser)]
#[command(name = "judge_stats")]
#[command(about = "Competitive programming stats aggregator")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    Stats(StatsArgs),
    Profile(ProfileArgs),
    Contests(ContestsArgs),
    Clist(ClistArgs),
}

fn main() {
    dotenv().ok();

    let log_level = env::var("RUST_LOG").unwrap_or(String::from("info"));
    let filter = EnvFilter::builder()
        .with_default_directive(
            LevelFilter::from_str(&log_level)
                .unwrap_or(LevelFilter::INFO)
                .into(),
        )
        .from_env_lossy();
    let format = fmt::format()
        .with_level(true)
        .with_target(true)
        .with_ansi(false)
        .with_thread_ids(true)
        .with_timer(OffsetTime::local_rfc_3339().expect("couldn't determine local time offset"));
    // 標準出力はJSONの結果に使うのでログは標準エラーへ出す
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .event_format(format)
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("failed to set tracing subscriber");

    let runtime = Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("failed to build tokio runtime");

    let result = match Cli::parse().command {
        Commands::Stats(args) => runtime.block_on(stats::run(args)),
        Commands::Profile(args) => runtime.block_on(profile::run(args)),
        Commands::Contests(args) => runtime.block_on(contests::run(args)),
        Commands::Clist(args) => runtime.block_on(clist::run(args)),
    };

    if let Err(e) = result {
        tracing::error!("command failed: {:?}", e);
        std::process::exit(1);
    }
}
