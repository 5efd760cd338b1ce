//! Hero FFA stats API client.

use super::{join_segments, UpstreamError};
use crate::config::UpstreamConfig;
use crate::models::{LeaderboardEntry, PlayerStats, SortKey};
use async_trait::async_trait;
use reqwest::StatusCode;
use tracing::debug;

/// Outcome of one upstream leaderboard page request that got an HTTP answer.
#[derive(Debug, Clone, PartialEq)]
pub enum UpstreamPage {
    /// Successful response; an empty list means there is no more data.
    Entries(Vec<LeaderboardEntry>),
    /// Non-success status, including not-found.
    Unavailable(StatusCode),
}

/// Source of leaderboard pages and player stats.
#[async_trait]
pub trait StatsSource: Send + Sync {
    /// Fetch one upstream leaderboard page (1-based).
    ///
    /// `Err` is reserved for transport failures: the request could not be
    /// sent, or a successful body could not be decoded.
    async fn fetch_top_page(&self, sort: SortKey, page: u32) -> Result<UpstreamPage, UpstreamError>;

    /// Fetch the full stats of one player. Any non-success status is an error.
    async fn fetch_player(&self, player_id: &str) -> Result<PlayerStats, UpstreamError>;
}

/// reqwest-backed client for `https://api.hglabor.de/stats/ffa`.
#[derive(Debug, Clone)]
pub struct StatsClient {
    http: reqwest::Client,
    base_url: String,
    timeout_seconds: u64,
}

impl StatsClient {
    pub fn new(http: reqwest::Client, config: &UpstreamConfig) -> Self {
        Self {
            http,
            base_url: config.stats_url.clone(),
            timeout_seconds: config.timeout_seconds,
        }
    }
}

#[async_trait]
impl StatsSource for StatsClient {
    async fn fetch_top_page(&self, sort: SortKey, page: u32) -> Result<UpstreamPage, UpstreamError> {
        let url = join_segments(&self.base_url, &["top"])?;
        debug!("GET {} sort={} page={}", url, sort, page);

        let response = self
            .http
            .get(url.clone())
            .query(&[("sort", sort.as_upstream_param().to_string()), ("page", page.to_string())])
            .send()
            .await
            .map_err(|e| UpstreamError::from_send(&url, self.timeout_seconds, e))?;

        let status = response.status();
        if !status.is_success() {
            return Ok(UpstreamPage::Unavailable(status));
        }

        let entries: Vec<LeaderboardEntry> = response
            .json()
            .await
            .map_err(|e| UpstreamError::decode(&url, e))?;

        Ok(UpstreamPage::Entries(entries))
    }

    async fn fetch_player(&self, player_id: &str) -> Result<PlayerStats, UpstreamError> {
        let url = join_segments(&self.base_url, &[player_id])?;
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

        response
            .json()
            .await
            .map_err(|e| UpstreamError::decode(&url, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::leaderboard::{Aggregator, AggregatorConfig};
    use crate::models::StopReason;
    use axum::extract::{Path, Query, State};
    use axum::response::{IntoResponse, Response};
    use axum::routing::get;
    use axum::{Json, Router};
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    type SeenQueries = Arc<Mutex<Vec<HashMap<String, String>>>>;

    /// Page 1 holds two players, every later page fails with a 500.
    async fn two_players_then_error(
        State(seen): State<SeenQueries>,
        Query(params): Query<HashMap<String, String>>,
    ) -> Response {
        let page = params.get("page").cloned().unwrap_or_default();
        seen.lock().unwrap().push(params);

        if page == "1" {
            Json(json!([
                {"playerId": "xp-a", "xp": 900, "kills": 3},
                {"playerId": "xp-b", "xp": 800}
            ]))
            .into_response()
        } else {
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }

    async fn one_player(Path(id): Path<String>) -> Response {
        if id == "xp-a" {
            Json(json!({"playerId": "xp-a", "name": "Alex", "kills": 3, "heroes": {}}))
                .into_response()
        } else {
            StatusCode::NOT_FOUND.into_response()
        }
    }

    /// Serve `router` on a loopback port and return the stats base URL.
    async fn spawn_upstream(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}/stats/ffa", addr)
    }

    async fn stats_upstream() -> (StatsClient, SeenQueries) {
        let seen = SeenQueries::default();
        let router = Router::new()
            .route("/stats/ffa/top", get(two_players_then_error))
            .route("/stats/ffa/{id}", get(one_player))
            .with_state(seen.clone());

        let config = UpstreamConfig {
            stats_url: spawn_upstream(router).await,
            timeout_seconds: 5,
            ..UpstreamConfig::default()
        };
        (StatsClient::new(reqwest::Client::new(), &config), seen)
    }

    #[tokio::test]
    async fn test_fetch_top_page_over_http() {
        let (client, seen) = stats_upstream().await;

        let first = client.fetch_top_page(SortKey::Experience, 1).await.unwrap();
        match first {
            UpstreamPage::Entries(entries) => {
                assert_eq!(entries.len(), 2);
                assert_eq!(entries[0].player_id, "xp-a");
                assert_eq!(entries[0].xp, 900);
                assert_eq!(entries[1].kills, 0);
            }
            other => panic!("unexpected page: {:?}", other),
        }

        let second = client.fetch_top_page(SortKey::Experience, 2).await.unwrap();
        assert_eq!(
            second,
            UpstreamPage::Unavailable(StatusCode::INTERNAL_SERVER_ERROR)
        );

        let seen = seen.lock().unwrap().clone();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].get("sort").map(String::as_str), Some("xp"));
        assert_eq!(seen[0].get("page").map(String::as_str), Some("1"));
        assert_eq!(seen[1].get("page").map(String::as_str), Some("2"));
    }

    #[tokio::test]
    async fn test_server_error_mid_run_keeps_partial_leaderboard() {
        let (client, seen) = stats_upstream().await;
        let aggregator = Aggregator::new(
            &client,
            AggregatorConfig {
                max_upstream_pages: 100,
                deadline: None,
            },
        );

        let result = aggregator
            .fetch_all_upstream_pages(SortKey::Experience)
            .await
            .unwrap();
        assert_eq!(result.stop_reason, StopReason::UpstreamUnavailable(500));

        let page = aggregator
            .get_leaderboard_page(SortKey::Experience, 1, 20)
            .await
            .unwrap();
        assert_eq!(page.total_players, 2);
        assert_eq!(page.leaderboard[0].player_id, "xp-a");
        assert!(!page.complete);

        let seen = seen.lock().unwrap();
        assert!(seen.iter().all(|q| q.get("sort").map(String::as_str) == Some("xp")));
    }

    #[tokio::test]
    async fn test_non_array_body_is_a_decode_error() {
        let router = Router::new().route(
            "/stats/ffa/top",
            get(|| async { Json(json!({"error": "maintenance"})) }),
        );
        let config = UpstreamConfig {
            stats_url: spawn_upstream(router).await,
            timeout_seconds: 5,
            ..UpstreamConfig::default()
        };
        let client = StatsClient::new(reqwest::Client::new(), &config);

        let err = client.fetch_top_page(SortKey::Kills, 1).await.unwrap_err();
        assert!(matches!(err, UpstreamError::Decode { .. }));
    }

    #[tokio::test]
    async fn test_fetch_player_over_http() {
        let (client, _) = stats_upstream().await;

        let stats = client.fetch_player("xp-a").await.unwrap();
        assert_eq!(stats.player_id, "xp-a");
        assert_eq!(stats.upstream_name(), Some("Alex"));
        assert_eq!(stats.kills, 3);

        let err = client.fetch_player("nobody").await.unwrap_err();
        assert!(matches!(
            err,
            UpstreamError::Status { status, .. } if status == StatusCode::NOT_FOUND
        ));
    }

    #[test]
    fn test_client_uses_configured_base() {
        let config = UpstreamConfig {
            stats_url: "http://localhost:9999/stats/ffa".to_string(),
            ..UpstreamConfig::default()
        };
        let client = StatsClient::new(reqwest::Client::new(), &config);
        assert_eq!(client.base_url, "http://localhost:9999/stats/ffa");
        assert_eq!(client.timeout_seconds, config.timeout_seconds);
    }

    #[tokio::test]
    async fn test_unreachable_upstream_is_a_transport_error() {
        // Port 9 (discard) on localhost is closed in test environments.
        let config = UpstreamConfig {
            stats_url: "http://127.0.0.1:9/stats/ffa".to_string(),
            timeout_seconds: 2,
            ..UpstreamConfig::default()
        };
        let client = StatsClient::new(reqwest::Client::new(), &config);

        let result = client.fetch_top_page(SortKey::Kills, 1).await;
        assert!(matches!(
            result,
            Err(UpstreamError::Connect { .. })
                | Err(UpstreamError::Transport { .. })
                | Err(UpstreamError::Timeout { .. })
        ));
    }
}
