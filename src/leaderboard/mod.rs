//! Leaderboard aggregation, pagination and request parsing.

pub mod aggregator;
pub mod query;

pub use aggregator::{compute_output_page, Aggregator, AggregatorConfig};
pub use query::{LeaderboardParams, LeaderboardQuery, QueryDefaults};
