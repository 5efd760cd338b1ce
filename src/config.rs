//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.herostats.toml` files.

use crate::models::SortKey;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default configuration file name, looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = ".herostats.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Upstream API settings.
    #[serde(default)]
    pub upstream: UpstreamConfig,

    /// Leaderboard aggregation settings.
    #[serde(default)]
    pub leaderboard: LeaderboardConfig,

    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Concurrent username lookups when rendering a leaderboard page.
    #[serde(default = "default_name_concurrency")]
    pub name_concurrency: usize,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            name_concurrency: default_name_concurrency(),
        }
    }
}

fn default_name_concurrency() -> usize {
    8
}

/// Third-party API endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    /// Hero FFA stats base URL (`/top` and `/{playerId}` live below it).
    #[serde(default = "default_stats_url")]
    pub stats_url: String,

    /// UUID to username resolver base URL.
    #[serde(default = "default_names_url")]
    pub names_url: String,

    /// Skin service base URL (`/profile/{name}`, `/render/body/{name}`).
    #[serde(default = "default_skins_url")]
    pub skins_url: String,

    /// Width and height of rendered skins, in pixels.
    #[serde(default = "default_skin_size")]
    pub skin_size: u32,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            stats_url: default_stats_url(),
            names_url: default_names_url(),
            skins_url: default_skins_url(),
            skin_size: default_skin_size(),
            timeout_seconds: default_timeout(),
        }
    }
}

fn default_stats_url() -> String {
    "https://api.hglabor.de/stats/ffa".to_string()
}

fn default_names_url() -> String {
    "https://api.ashcon.app/mojang/v2/user".to_string()
}

fn default_skins_url() -> String {
    "https://skins.danielraybone.com/v1".to_string()
}

fn default_skin_size() -> u32 {
    300
}

fn default_timeout() -> u64 {
    10
}

/// Leaderboard aggregation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaderboardConfig {
    /// Entries per served page.
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    /// Upper bound on upstream pages fetched for one request.
    #[serde(default = "default_max_upstream_pages")]
    pub max_upstream_pages: u32,

    /// Wall-clock budget for fetching all upstream pages (0 disables it).
    #[serde(default = "default_deadline")]
    pub deadline_seconds: u64,

    /// Sort key used when a request names none, or an unknown one.
    #[serde(default)]
    pub default_sort: SortKey,
}

impl Default for LeaderboardConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            max_upstream_pages: default_max_upstream_pages(),
            deadline_seconds: default_deadline(),
            default_sort: SortKey::default(),
        }
    }
}

fn default_page_size() -> usize {
    20
}

fn default_max_upstream_pages() -> u32 {
    1000
}

fn default_deadline() -> u64 {
    60
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address to bind to.
    #[serde(default = "default_bind")]
    pub bind: String,

    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
        }
    }
}

fn default_bind() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        Self::load_from_dir(Path::new("."))
    }

    /// Try to load `.herostats.toml` from a directory.
    pub fn load_from_dir(dir: &Path) -> Result<Option<Self>> {
        let config_path = dir.join(CONFIG_FILE_NAME);

        if config_path.exists() {
            Ok(Some(Self::load(&config_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings, but only
    /// when they were given explicitly.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref stats_url) = args.stats_url {
            self.upstream.stats_url = stats_url.clone();
        }

        if let Some(timeout) = args.timeout {
            self.upstream.timeout_seconds = timeout;
        }

        if let Some(crate::cli::Command::Serve { ref bind, port }) = args.command {
            if let Some(bind) = bind {
                self.server.bind = bind.clone();
            }
            if let Some(port) = port {
                self.server.port = port;
            }
        }
    }

    /// Reject settings the service cannot run with.
    pub fn validate(&self) -> Result<()> {
        for (name, url) in [
            ("upstream.stats_url", &self.upstream.stats_url),
            ("upstream.names_url", &self.upstream.names_url),
            ("upstream.skins_url", &self.upstream.skins_url),
        ] {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                bail!("{} must start with 'http://' or 'https://'", name);
            }
        }

        if self.upstream.timeout_seconds == 0 {
            bail!("upstream.timeout_seconds must be at least 1");
        }
        if self.leaderboard.page_size == 0 {
            bail!("leaderboard.page_size must be at least 1");
        }
        if self.leaderboard.max_upstream_pages == 0 {
            bail!("leaderboard.max_upstream_pages must be at least 1");
        }

        Ok(())
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}
