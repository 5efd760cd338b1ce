//! Request parameters for the leaderboard.
//!
//! Raw query strings are turned into typed values here, once, so the
//! aggregator never sees an invalid sort key or page number.

use crate::models::SortKey;
use serde::Deserialize;

/// Raw `?sort=&page=` parameters, exactly as the client sent them.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LeaderboardParams {
    pub sort: Option<String>,
    pub page: Option<String>,
}

/// Values used when a parameter is missing or unusable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryDefaults {
    pub sort: SortKey,
    pub page: u32,
}

impl Default for QueryDefaults {
    fn default() -> Self {
        Self {
            sort: SortKey::Kills,
            page: 1,
        }
    }
}

/// A validated leaderboard request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeaderboardQuery {
    pub sort: SortKey,
    /// 1-based, never zero.
    pub page: u32,
}

impl LeaderboardQuery {
    /// Applies the defaults: unknown or absent sort falls back to the
    /// default sort; a page that is absent, not a whole number, or below 1
    /// falls back to the default page.
    pub fn from_params(params: &LeaderboardParams, defaults: QueryDefaults) -> Self {
        let sort = params
            .sort
            .as_deref()
            .and_then(|s| s.parse::<SortKey>().ok())
            .unwrap_or(defaults.sort);

        let page = params
            .page
            .as_deref()
            .and_then(parse_page)
            .unwrap_or(defaults.page.max(1));

        Self { sort, page }
    }
}

fn parse_page(raw: &str) -> Option<u32> {
    let page = raw.trim().parse::<i64>().ok()?;
    if page < 1 {
        return None;
    }
    Some(u32::try_from(page).unwrap_or(u32::MAX))
}
