pub mod aggregator;
pub mod clist;
pub mod config;
pub mod error;
pub mod http;
pub mod model;
pub mod platforms;
pub mod rate_limit;

pub use aggregator::StatsAggregator;
pub use config::Config;
pub use error::StatsError;
pub use model::{NormalizedPlatformStats, Platform, PlatformHandle, ProfileSummary};
