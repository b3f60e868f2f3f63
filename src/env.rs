//! Defines the environment variables to use.

use crate::static_lazy_lock;

use std::{env, time::Duration};

/// Parses an environment variable from [`String`] to something else, wrapping any error in
/// [`anyhow::Error`].
#[macro_export]
macro_rules! parse_env {
    ($key:expr => |$var:ident| $expr:expr) => {
        std::env::var($key)
            .map_err(|e| anyhow::anyhow!(e))
            .and_then(|$var| $expr)
    };
    ($key:expr => |$var:ident| $expr:expr; anyhow) => {
        parse_env!($key => |$var| $expr.map_err(|e| anyhow::anyhow!(e)))
    };
}

pub use parse_env;

#[cfg(feature = "env_github_token")]
static_lazy_lock! {
    /// The GitHub token, used by the `gist` step when no `token` parameter is given.
    pub GITHUB_TOKEN: Option<String> = env::var("GITHUB_TOKEN").ok().filter(|s| !s.is_empty());
}

static_lazy_lock! {
    /// The root of GitHub REST API. GitHub Actions sets it for enterprise servers.
    pub GITHUB_API_URL: String = env::var("GITHUB_API_URL")
        .ok()
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| String::from("https://api.github.com"));
}

static_lazy_lock! {
    /// The maximum retry limit for a step.
    pub MAX_RETRIES: u8 = parse_env!("MAX_RETRIES" => |s| s.parse::<u8>(); anyhow).unwrap_or(5);
}

static_lazy_lock! {
    /// The delay between two attempts of a step.
    pub RETRY_DELAY: Duration = Duration::from_millis(
        parse_env!("RETRY_DELAY_MS" => |s| s.parse::<u64>(); anyhow).unwrap_or(1000),
    );
}

static_lazy_lock! {
    /// The total timeout of a single HTTP request.
    pub HTTP_TIMEOUT: Duration = Duration::from_secs(
        parse_env!("HTTP_TIMEOUT_SECS" => |s| s.parse::<u64>(); anyhow).unwrap_or(300),
    );
}

static_lazy_lock! {
    /// A proxy applied to every outgoing request, if set.
    pub HTTP_PROXY_URL: Option<String> = env::var("HTTP_PROXY_URL").ok().filter(|s| !s.is_empty());
}
