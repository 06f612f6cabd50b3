use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use reqwest::Url;
use std::{env, time::Duration};

use crate::rate_limit::DEFAULT_ALLOWANCE;

pub static CODEFORCES_API_URL: Lazy<Url> =
    Lazy::new(|| Url::parse("https://codeforces.com/api/").unwrap());
pub static LEETCODE_API_URL: Lazy<Url> =
    Lazy::new(|| Url::parse("https://alfa-leetcode-api.onrender.com/").unwrap());
pub static HACKERRANK_URL: Lazy<Url> =
    Lazy::new(|| Url::parse("https://www.hackerrank.com/").unwrap());
pub static CLIST_API_URL: Lazy<Url> =
    Lazy::new(|| Url::parse("https://clist.by/api/v4/").unwrap());

const DEFAULT_TIMEOUT_SECONDS: u64 = 10;

/// Base URLs of every upstream service. Each one ends with a slash so that paths can be joined onto it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub codeforces: Url,
    pub leetcode: Url,
    pub hackerrank: Url,
    pub clist: Url,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            codeforces: CODEFORCES_API_URL.clone(),
            leetcode: LEETCODE_API_URL.clone(),
            hackerrank: HACKERRANK_URL.clone(),
            clist: CLIST_API_URL.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClistCredentials {
    pub username: String,
    pub api_key: String,
}

impl ClistCredentials {
    pub fn authorization(&self) -> String {
        format!("ApiKey {}:{}", self.username, self.api_key)
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub endpoints: Endpoints,
    pub clist: Option<ClistCredentials>,
    pub timeout: Duration,
    pub leetcode_allowance: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoints: Endpoints::default(),
            clist: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECONDS),
            leetcode_allowance: DEFAULT_ALLOWANCE,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_vars(|key| env::var(key).ok())
    }

    /// Build a config from a variable lookup. Blank values count as unset.
    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let endpoints = Endpoints {
            codeforces: url_from_var(
                "CODEFORCES_API_URL",
                var("CODEFORCES_API_URL"),
                &CODEFORCES_API_URL,
            )?,
            leetcode: url_from_var(
                "LEETCODE_API_URL",
                var("LEETCODE_API_URL"),
                &LEETCODE_API_URL,
            )?,
            hackerrank: url_from_var(
                "HACKERRANK_URL",
                var("HACKERRANK_URL"),
                &HACKERRANK_URL,
            )?,
            clist: url_from_var(
                "CLIST_API_URL",
                var("CLIST_API_URL"),
                &CLIST_API_URL,
            )?,
        };

        let clist = match (var("CLIST_USERNAME"), var("CLIST_API_KEY")) {
            (Some(username), Some(api_key)) => Some(ClistCredentials { username, api_key }),
            _ => {
                tracing::warn!("CLIST_USERNAME or CLIST_API_KEY is not set. Contest aggregator requests will be unavailable.");
                None
            }
        };

        let timeout = match var("HTTP_TIMEOUT_SECONDS") {
            Some(value) => Duration::from_secs(value.trim().parse::<u64>().with_context(|| {
                let message = format!("HTTP_TIMEOUT_SECONDS must be an integer: {}", value);
                tracing::error!(message);
                message
            })?),
            None => Duration::from_secs(DEFAULT_TIMEOUT_SECONDS),
        };

        let leetcode_allowance = match var("LEETCODE_RATE_LIMIT") {
            Some(value) => value.trim().parse::<u32>().with_context(|| {
                let message = format!("LEETCODE_RATE_LIMIT must be an integer: {}", value);
                tracing::error!(message);
                message
            })?,
            None => DEFAULT_ALLOWANCE,
        };

        Ok(Self {
            endpoints,
            clist,
            timeout,
            leetcode_allowance,
        })
    }
}

fn url_from_var(key: &str, value: Option<String>, default: &Url) -> Result<Url> {
    match value {
        Some(value) => {
            let value = if value.ends_with('/') {
                value
            } else {
                format!("{}/", value)
            };
            Url::parse(&value).with_context(|| {
                let message = format!("{} is not a valid url: {}", key, value);
                tracing::error!(message);
                message
            })
        }
        None => {
            tracing::debug!(
                "{} environment variable is not set. Default value `{}` will be used.",
                key,
                default
            );
            Ok(default.clone())
        }
    }
}
