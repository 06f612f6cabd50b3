use crate::cmd::{build_aggregator, print_json};
use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use std::fmt;

#[derive(Debug, ValueEnum, Clone, Copy)]
pub enum ClistTarget {
    Contests,
    Contest,
    Coder,
    Me,
    Resources,
    Problems,
    Statistics,
    Ping,
}

impl fmt::Display for ClistTarget {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ClistTarget::Contests => write!(f, "contests"),
            ClistTarget::Contest => write!(f, "contest"),
            ClistTarget::Coder => write!(f, "coder"),
            ClistTarget::Me => write!(f, "me"),
            ClistTarget::Resources => write!(f, "resources"),
            ClistTarget::Problems => write!(f, "problems"),
            ClistTarget::Statistics => write!(f, "statistics"),
            ClistTarget::Ping => write!(f, "ping"),
        }
    }
}

#[derive(Debug, Args)]
pub struct ClistArgs {
    target: ClistTarget,
    #[arg(long)]
    id: Option<String>,
}

fn require_id(args: &ClistArgs) -> Result<&str> {
    match args.id.as_deref() {
        Some(id) => Ok(id),
        None => {
            let message = format!("--id is required for {}", args.target);
            tracing::error!(message);
            anyhow::bail!(message)
        }
    }
}

pub async fn run(args: ClistArgs) -> Result<()> {
    let aggregator = build_aggregator()?;
    let client = aggregator.clist();
    if !client.is_configured() {
        let message = "CLIST_USERNAME and CLIST_API_KEY must be set to use clist";
        tracing::error!(message);
        anyhow::bail!(message)
    }

    let context = || format!("failed to fetch {} from clist", args.target);
    match args.target {
        ClistTarget::Contests => print_json(&client.contests().await.with_context(context)?),
        ClistTarget::Contest => {
            print_json(&client.contest(require_id(&args)?).await.with_context(context)?)
        }
        ClistTarget::Coder => {
            print_json(&client.coder(require_id(&args)?).await.with_context(context)?)
        }
        ClistTarget::Me => print_json(&client.my_profile().await.with_context(context)?),
        ClistTarget::Resources => print_json(&client.resources().await.with_context(context)?),
        ClistTarget::Problems => print_json(&client.problems().await.with_context(context)?),
        ClistTarget::Statistics => print_json(&client.statistics().await.with_context(context)?),
        ClistTarget::Ping => {
            let ok = client.test_connection().await.with_context(context)?;
            tracing::info!("contest aggregator connection: {}", ok);
            print_json(&serde_json::json!({ "ok": ok }))
        }
    }
}
