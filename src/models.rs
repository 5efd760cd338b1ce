//! Data models for Hero FFA statistics.
//!
//! This module contains the core data structures shared by the upstream
//! clients, the leaderboard aggregator, the HTTP service and the report
//! renderer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Field the upstream leaderboard is ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    /// Most kills first (upstream default)
    #[default]
    Kills,
    /// Most deaths first
    Deaths,
    /// Most experience first
    #[serde(rename = "xp", alias = "experience")]
    Experience,
}

impl SortKey {
    /// All sort keys, in display order.
    pub const ALL: [SortKey; 3] = [SortKey::Kills, SortKey::Deaths, SortKey::Experience];

    /// Value of the upstream `sort` query parameter.
    pub fn as_upstream_param(&self) -> &'static str {
        match self {
            SortKey::Kills => "kills",
            SortKey::Deaths => "deaths",
            SortKey::Experience => "xp",
        }
    }

    /// Human-readable column title.
    pub fn label(&self) -> &'static str {
        match self {
            SortKey::Kills => "Kills",
            SortKey::Deaths => "Deaths",
            SortKey::Experience => "XP",
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_upstream_param())
    }
}

/// Error returned when a string does not name a sort key.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown sort key '{0}' (expected kills, deaths or xp)")]
pub struct ParseSortKeyError(pub String);

impl FromStr for SortKey {
    type Err = ParseSortKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "kills" => Ok(SortKey::Kills),
            "deaths" => Ok(SortKey::Deaths),
            "xp" | "experience" => Ok(SortKey::Experience),
            _ => Err(ParseSortKeyError(s.to_string())),
        }
    }
}

/// One row of the upstream `top` listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    /// Opaque player id (a Minecraft UUID in practice).
    pub player_id: String,
    #[serde(default)]
    pub kills: u64,
    #[serde(default)]
    pub deaths: u64,
    /// Experience points.
    #[serde(default)]
    pub xp: u64,
    #[serde(default)]
    pub current_kill_streak: u64,
    #[serde(default)]
    pub highest_kill_streak: u64,
    #[serde(default)]
    pub bounty: u64,
}

impl LeaderboardEntry {
    /// Kill/death ratio of this entry.
    pub fn kd_ratio(&self) -> f64 {
        kd_ratio(self.kills, self.deaths)
    }
}

/// Kills divided by deaths, or plain kills for a player who never died.
pub fn kd_ratio(kills: u64, deaths: u64) -> f64 {
    if deaths > 0 {
        kills as f64 / deaths as f64
    } else {
        kills as f64
    }
}

/// Full statistics of a single player, as served by the stats API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerStats {
    pub player_id: String,
    /// Username, when the stats API sends one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub xp: u64,
    #[serde(default)]
    pub kills: u64,
    #[serde(default)]
    pub deaths: u64,
    #[serde(default)]
    pub current_kill_streak: u64,
    #[serde(default)]
    pub highest_kill_streak: u64,
    #[serde(default)]
    pub bounty: u64,
    /// hero -> ability -> stat -> `{ "experiencePoints": n }`
    #[serde(default)]
    pub heroes: serde_json::Value,
}

impl PlayerStats {
    /// Upstream username, ignoring blank values.
    pub fn upstream_name(&self) -> Option<&str> {
        self.name.as_deref().map(str::trim).filter(|n| !n.is_empty())
    }

    /// Total experience per hero, highest first.
    ///
    /// Every `experiencePoints` number nested under a hero counts towards
    /// that hero; anything that is not an object is ignored.
    pub fn hero_experience(&self) -> Vec<(String, u64)> {
        let Some(heroes) = self.heroes.as_object() else {
            return Vec::new();
        };

        let mut totals: Vec<(String, u64)> = heroes
            .iter()
            .map(|(hero, abilities)| (hero.clone(), sum_experience_points(abilities)))
            .collect();

        totals.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        totals
    }
}

fn sum_experience_points(value: &serde_json::Value) -> u64 {
    match value {
        serde_json::Value::Object(map) => map
            .iter()
            .map(|(key, child)| match child {
                serde_json::Value::Number(n) if key == "experiencePoints" => n
                    .as_u64()
                    .or_else(|| n.as_f64().map(|f| f.max(0.0) as u64))
                    .unwrap_or(0),
                other => sum_experience_points(other),
            })
            .sum(),
        _ => 0,
    }
}

/// Flattened single-player view used by the player-details endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerDetails {
    pub uuid: String,
    pub name: String,
    pub kills: u64,
    pub deaths: u64,
    pub xp: u64,
    pub killstreak: u64,
    pub peak_killstreak: u64,
    pub bounty: u64,
}

impl PlayerDetails {
    /// Name shown when the username cannot be resolved.
    pub const UNKNOWN_NAME: &'static str = "Unknown Player";

    /// Maps raw stats and an optionally resolved username. A name carried
    /// by the stats themselves wins over `name`.
    pub fn from_stats(stats: &PlayerStats, name: Option<String>) -> Self {
        Self {
            uuid: stats.player_id.clone(),
            name: stats
                .upstream_name()
                .map(str::to_string)
                .or(name)
                .unwrap_or_else(|| Self::UNKNOWN_NAME.to_string()),
            kills: stats.kills,
            deaths: stats.deaths,
            xp: stats.xp,
            killstreak: stats.current_kill_streak,
            peak_killstreak: stats.highest_kill_streak,
            bounty: stats.bounty,
        }
    }

    pub fn kd_ratio(&self) -> f64 {
        kd_ratio(self.kills, self.deaths)
    }
}

/// Why the upstream fetch loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "reason", content = "status")]
pub enum StopReason {
    /// Upstream served an empty page.
    Exhausted,
    /// Upstream answered with a non-success HTTP status.
    UpstreamUnavailable(u16),
    /// The configured maximum number of upstream pages was reached.
    PageLimit,
    /// The wall-clock budget for the whole fetch ran out.
    Deadline,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::Exhausted => write!(f, "end of data"),
            StopReason::UpstreamUnavailable(status) => {
                write!(f, "upstream answered with status {}", status)
            }
            StopReason::PageLimit => write!(f, "upstream page limit reached"),
            StopReason::Deadline => write!(f, "fetch deadline exceeded"),
        }
    }
}

/// Every upstream page for one sort key, concatenated in page order.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregatedResult {
    pub entries: Vec<LeaderboardEntry>,
    /// Number of non-empty upstream pages that were collected.
    pub upstream_pages: u32,
    pub stop_reason: StopReason,
}

impl AggregatedResult {
    /// True when the loop ended on the upstream's own end-of-data signal.
    pub fn is_complete(&self) -> bool {
        self.stop_reason == StopReason::Exhausted
    }

    pub fn total_players(&self) -> usize {
        self.entries.len()
    }
}

/// One page of the re-paginated leaderboard.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputPage {
    /// Effective 1-based page number.
    pub page: u32,
    pub total_pages: u32,
    pub total_players: usize,
    /// False when aggregation stopped before the upstream ran out of data.
    pub complete: bool,
    pub leaderboard: Vec<LeaderboardEntry>,
    #[serde(skip)]
    pub page_size: usize,
}

impl OutputPage {
    /// Overall 1-based rank of the entry at `index` on this page.
    pub fn rank_of(&self, index: usize) -> usize {
        (self.page.max(1) as usize - 1) * self.page_size + index + 1
    }
}

/// One rendered leaderboard row.
#[derive(Debug, Clone, Serialize)]
pub struct RankedRow {
    pub rank: usize,
    pub player_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub kills: u64,
    pub deaths: u64,
    pub kd_ratio: f64,
    pub xp: u64,
}

impl RankedRow {
    /// Username when resolved, raw id otherwise.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.player_id)
    }
}

/// Metadata about a rendered leaderboard.
#[derive(Debug, Clone, Serialize)]
pub struct ReportMetadata {
    pub sort: SortKey,
    pub generated_at: DateTime<Utc>,
    pub upstream_pages: u32,
    pub stop_reason: StopReason,
    pub duration_seconds: f64,
}

/// A leaderboard page ready for rendering.
#[derive(Debug, Clone, Serialize)]
pub struct LeaderboardReport {
    pub metadata: ReportMetadata,
    pub page: u32,
    pub total_pages: u32,
    pub total_players: usize,
    pub complete: bool,
    pub rows: Vec<RankedRow>,
}

impl LeaderboardReport {
    /// Builds rows from an output page. `names` lines up with the page's
    /// entries; missing positions render the raw id.
    pub fn new(metadata: ReportMetadata, page: &OutputPage, names: Vec<Option<String>>) -> Self {
        let mut names = names.into_iter();
        let rows = page
            .leaderboard
            .iter()
            .enumerate()
            .map(|(index, entry)| RankedRow {
                rank: page.rank_of(index),
                player_id: entry.player_id.clone(),
                name: names.next().flatten(),
                kills: entry.kills,
                deaths: entry.deaths,
                kd_ratio: entry.kd_ratio(),
                xp: entry.xp,
            })
            .collect();

        Self {
            metadata,
            page: page.page,
            total_pages: page.total_pages,
            total_players: page.total_players,
            complete: page.complete,
            rows,
        }
    }
}

/// A single player's card.
#[derive(Debug, Clone, Serialize)]
pub struct PlayerCard {
    pub generated_at: DateTime<Utc>,
    pub details: PlayerDetails,
    pub kd_ratio: f64,
    pub hero_experience: Vec<(String, u64)>,
}

impl PlayerCard {
    pub fn new(stats: &PlayerStats, name: Option<String>) -> Self {
        let details = PlayerDetails::from_stats(stats, name);
        Self {
            generated_at: Utc::now(),
            kd_ratio: details.kd_ratio(),
            details,
            hero_experience: stats.hero_experience(),
        }
    }
}
