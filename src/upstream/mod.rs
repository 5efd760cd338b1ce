//! Clients for the third-party APIs the service reads from.
//!
//! - `stats`: Hero FFA stats (leaderboard pages and single players)
//! - `profiles`: UUID to username resolution, Minecraft profiles and skins

pub mod profiles;
pub mod stats;

pub use profiles::{player_name, resolve_names, resolve_player_id, ProfileClient, ProfileSource};
pub use stats::{StatsClient, StatsSource, UpstreamPage};

use crate::config::UpstreamConfig;
use reqwest::{StatusCode, Url};
use std::time::Duration;

/// Errors raised while talking to an upstream API.
#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("invalid upstream URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("request to {url} timed out after {seconds}s")]
    Timeout { url: String, seconds: u64 },

    #[error("cannot connect to {url}")]
    Connect {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} answered with status {status}")]
    Status { url: String, status: StatusCode },

    #[error("failed to decode response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

impl UpstreamError {
    /// Classifies a reqwest send error the same way for every client.
    pub(crate) fn from_send(url: &Url, timeout_seconds: u64, e: reqwest::Error) -> Self {
        let url = url.to_string();
        if e.is_timeout() {
            UpstreamError::Timeout {
                url,
                seconds: timeout_seconds,
            }
        } else if e.is_connect() {
            UpstreamError::Connect { url, source: e }
        } else {
            UpstreamError::Transport { url, source: e }
        }
    }

    pub(crate) fn decode(url: &Url, e: reqwest::Error) -> Self {
        UpstreamError::Decode {
            url: url.to_string(),
            source: e,
        }
    }
}

/// Builds the HTTP client shared by all upstream clients.
pub fn build_http_client(config: &UpstreamConfig) -> Result<reqwest::Client, UpstreamError> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_seconds))
        .user_agent(concat!("herostats/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(UpstreamError::Client)
}

/// Appends percent-encoded path segments to a base URL.
pub(crate) fn join_segments<S: AsRef<str>>(base: &str, segments: &[S]) -> Result<Url, UpstreamError> {
    let invalid = |reason: String| UpstreamError::InvalidUrl {
        url: base.to_string(),
        reason,
    };

    let mut url = Url::parse(base).map_err(|e| invalid(e.to_string()))?;
    url.path_segments_mut()
        .map_err(|_| invalid("cannot be a base URL".to_string()))?
        .pop_if_empty()
        .extend(segments.iter().map(AsRef::as_ref));

    Ok(url)
}
