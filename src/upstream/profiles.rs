//! Username resolution and skin rendering clients.
//!
//! Usernames come from the Ashcon Mojang mirror; profiles and body renders
//! come from the skin service.

use super::{join_segments, UpstreamError};
use crate::config::UpstreamConfig;
use crate::models::PlayerStats;
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use serde::Deserialize;
use tracing::{debug, warn};

/// Source of Minecraft identity data.
#[async_trait]
pub trait ProfileSource: Send + Sync {
    /// Resolve a player UUID to its current username.
    async fn resolve_username(&self, uuid: &str) -> Result<String, UpstreamError>;

    /// Resolve a username to the player's UUID.
    async fn resolve_uuid(&self, username: &str) -> Result<String, UpstreamError>;

    /// Fetch the skin service's profile document for a username.
    async fn fetch_profile(&self, username: &str) -> Result<serde_json::Value, UpstreamError>;

    /// Fetch a PNG body render for a username.
    async fn fetch_skin(&self, username: &str) -> Result<Vec<u8>, UpstreamError>;
}

/// Ashcon answers the same document for a UUID or a username.
#[derive(Debug, Deserialize)]
struct AshconUser {
    uuid: String,
    username: String,
}

/// reqwest-backed [`ProfileSource`].
#[derive(Debug, Clone)]
pub struct ProfileClient {
    http: reqwest::Client,
    names_url: String,
    skins_url: String,
    skin_size: u32,
    timeout_seconds: u64,
}

impl ProfileClient {
    pub fn new(http: reqwest::Client, config: &UpstreamConfig) -> Self {
        Self {
            http,
            names_url: config.names_url.clone(),
            skins_url: config.skins_url.clone(),
            skin_size: config.skin_size,
            timeout_seconds: config.timeout_seconds,
        }
    }

    async fn get_ok(&self, url: reqwest::Url) -> Result<reqwest::Response, UpstreamError> {
        debug!("GET {}", url);

        let response = self
            .http
            .get(url.clone())
            .send()
            .await
            .map_err(|e| UpstreamError::from_send(&url, self.timeout_seconds, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(UpstreamError::Status {
                url: url.to_string(),
                status,
            });
        }

        Ok(response)
    }

    async fn ashcon_user(&self, key: &str) -> Result<AshconUser, UpstreamError> {
        let url = join_segments(&self.names_url, &[key.trim()])?;
        self.get_ok(url.clone())
            .await?
            .json()
            .await
            .map_err(|e| UpstreamError::decode(&url, e))
    }
}

#[async_trait]
impl ProfileSource for ProfileClient {
    async fn resolve_username(&self, uuid: &str) -> Result<String, UpstreamError> {
        Ok(self.ashcon_user(uuid).await?.username)
    }

    async fn resolve_uuid(&self, username: &str) -> Result<String, UpstreamError> {
        Ok(self.ashcon_user(username).await?.uuid)
    }

    async fn fetch_profile(&self, username: &str) -> Result<serde_json::Value, UpstreamError> {
        let url = join_segments(&self.skins_url, &["profile", username])?;
        self.get_ok(url.clone())
            .await?
            .json()
            .await
            .map_err(|e| UpstreamError::decode(&url, e))
    }

    async fn fetch_skin(&self, username: &str) -> Result<Vec<u8>, UpstreamError> {
        let mut url = join_segments(&self.skins_url, &["render", "body", username])?;
        let size = self.skin_size.to_string();
        url.query_pairs_mut()
            .append_pair("width", &size)
            .append_pair("height", &size);

        let bytes = self
            .get_ok(url.clone())
            .await?
            .bytes()
            .await
            .map_err(|e| UpstreamError::decode(&url, e))?;

        Ok(bytes.to_vec())
    }
}

/// True for a player UUID, with or without dashes.
///
/// Minecraft usernames are at most 16 characters, so they never match.
pub fn looks_like_uuid(input: &str) -> bool {
    let input = input.trim();
    let hex_digits = input.chars().filter(|c| c.is_ascii_hexdigit()).count();
    let dashes = input.chars().filter(|c| *c == '-').count();

    hex_digits == 32 && (input.len() == 32 || (input.len() == 36 && dashes == 4))
}

/// Turn a UUID or a username into a player id for the stats API.
pub async fn resolve_player_id(
    source: &dyn ProfileSource,
    input: &str,
) -> Result<String, UpstreamError> {
    let input = input.trim();
    if looks_like_uuid(input) {
        return Ok(input.to_string());
    }

    debug!("Resolving username {} to a UUID", input);
    source.resolve_uuid(input).await
}

/// Display name for a player: the name in the stats payload if there is
/// one, otherwise a username lookup. Lookup failures yield `None`.
pub async fn player_name(source: &dyn ProfileSource, stats: &PlayerStats) -> Option<String> {
    if let Some(name) = stats.upstream_name() {
        return Some(name.to_string());
    }

    match source.resolve_username(&stats.player_id).await {
        Ok(name) => Some(name),
        Err(e) => {
            warn!("Could not resolve username for {}: {}", stats.player_id, e);
            None
        }
    }
}

/// Resolve usernames for a list of player ids, keeping input order.
///
/// At most `concurrency` lookups are in flight. A failed lookup yields
/// `None` for that position instead of failing the batch.
pub async fn resolve_names(
    source: &dyn ProfileSource,
    player_ids: &[String],
    concurrency: usize,
) -> Vec<Option<String>> {
    stream::iter(player_ids)
        .map(|id| async move {
            match source.resolve_username(id).await {
                Ok(name) => Some(name),
                Err(e) => {
                    warn!("Could not resolve username for {}: {}", id, e);
                    None
                }
            }
        })
        .buffered(concurrency.max(1))
        .collect()
        .await
}
