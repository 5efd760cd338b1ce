//! Request handlers of the JSON API.

use axum::extract::{Path, Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use crate::leaderboard::{Aggregator, LeaderboardParams, LeaderboardQuery};
use crate::models::{OutputPage, PlayerDetails, PlayerStats};
use crate::upstream;

use super::error::ApiError;
use super::http::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct PlayerIdParams {
    pub id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct MinecraftParams {
    pub username: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok", "version": env!("CARGO_PKG_VERSION") }))
}

/// `GET /api/leaderboard?sort=&page=`
pub async fn leaderboard(
    State(state): State<AppState>,
    Query(params): Query<LeaderboardParams>,
) -> Result<Json<OutputPage>, ApiError> {
    let query = LeaderboardQuery::from_params(&params, state.leaderboard.defaults);
    info!("Leaderboard request sort={} page={}", query.sort, query.page);

    let aggregator = Aggregator::new(state.stats.as_ref(), state.leaderboard.aggregator.clone());
    let page = aggregator
        .get_leaderboard_page(query.sort, query.page, state.leaderboard.page_size)
        .await
        .map_err(ApiError::Leaderboard)?;

    Ok(Json(page))
}

/// `GET /api/player-details?id=`: flattened stats plus the player's name.
pub async fn player_details(
    State(state): State<AppState>,
    Query(params): Query<PlayerIdParams>,
) -> Result<Json<PlayerDetails>, ApiError> {
    let id = non_empty(params.id).ok_or(ApiError::BadRequest("Player ID is required"))?;

    let stats = state
        .stats
        .fetch_player(&id)
        .await
        .map_err(ApiError::PlayerDetails)?;

    let name = upstream::player_name(state.profiles.as_ref(), &stats).await;

    Ok(Json(PlayerDetails::from_stats(&stats, name)))
}

/// `GET /api/player-details/{id}`: raw upstream stats.
pub async fn player_stats(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<PlayerStats>, ApiError> {
    let id = non_empty(Some(id)).ok_or(ApiError::BadRequest("Player ID is required"))?;

    let stats = state
        .stats
        .fetch_player(&id)
        .await
        .map_err(ApiError::PlayerDetails)?;

    Ok(Json(stats))
}

/// `GET /api/minecraft?username=&type=profile|skin`
pub async fn minecraft(
    State(state): State<AppState>,
    Query(params): Query<MinecraftParams>,
) -> Result<Response, ApiError> {
    let (Some(username), Some(kind)) = (non_empty(params.username), non_empty(params.kind)) else {
        return Err(ApiError::BadRequest("Username and type are required"));
    };

    match kind.as_str() {
        "profile" => {
            let profile = state
                .profiles
                .fetch_profile(&username)
                .await
                .map_err(ApiError::Minecraft)?;
            Ok(Json(profile).into_response())
        }
        "skin" => {
            let png = state
                .profiles
                .fetch_skin(&username)
                .await
                .map_err(ApiError::Minecraft)?;
            Ok((
                [
                    (header::CONTENT_TYPE, "image/png"),
                    (header::CACHE_CONTROL, "public, max-age=3600"),
                ],
                png,
            )
                .into_response())
        }
        _ => Err(ApiError::BadRequest("Invalid type")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::models::{LeaderboardEntry, SortKey};
    use crate::upstream::{ProfileSource, StatsSource, UpstreamError, UpstreamPage};
    use async_trait::async_trait;
    use axum::http::StatusCode;
    use std::collections::HashMap;
    use std::sync::Arc;

    const PNG_MAGIC: [u8; 4] = [0x89, b'P', b'N', b'G'];

    struct FakeStats {
        /// Upstream pages per sort key; a missing page is an empty page.
        pages: HashMap<SortKey, Vec<Vec<LeaderboardEntry>>>,
        fail_at: Option<u32>,
        transport_down: bool,
    }

    fn entry(id: &str, kills: u64) -> LeaderboardEntry {
        LeaderboardEntry {
            player_id: id.to_string(),
            kills,
            deaths: 1,
            xp: 5,
            current_kill_streak: 0,
            highest_kill_streak: 0,
            bounty: 0,
        }
    }

    fn transport_error() -> UpstreamError {
        UpstreamError::Timeout {
            url: "https://stats.test".to_string(),
            seconds: 10,
        }
    }

    #[async_trait]
    impl StatsSource for FakeStats {
        async fn fetch_top_page(&self, sort: SortKey, page: u32) -> Result<UpstreamPage, UpstreamError> {
            if self.transport_down {
                return Err(transport_error());
            }
            if self.fail_at == Some(page) {
                return Ok(UpstreamPage::Unavailable(StatusCode::INTERNAL_SERVER_ERROR));
            }
            let entries = self
                .pages
                .get(&sort)
                .and_then(|pages| pages.get(page as usize - 1))
                .cloned()
                .unwrap_or_default();
            Ok(UpstreamPage::Entries(entries))
        }

        async fn fetch_player(&self, player_id: &str) -> Result<PlayerStats, UpstreamError> {
            if self.transport_down {
                return Err(transport_error());
            }
            if player_id == "named" {
                return Ok(serde_json::from_value(json!({
                    "playerId": "named",
                    "name": "Dream",
                    "kills": 1
                }))
                .unwrap());
            }
            if player_id != "known" {
                return Err(UpstreamError::Status {
                    url: format!("https://stats.test/{}", player_id),
                    status: StatusCode::NOT_FOUND,
                });
            }
            Ok(serde_json::from_value(json!({
                "playerId": "known",
                "kills": 12,
                "deaths": 4,
                "xp": 300,
                "currentKillStreak": 2,
                "highestKillStreak": 9,
                "bounty": 15,
                "heroes": {"aang": {"air_ball": {"cooldown": {"experiencePoints": 10}}}}
            }))
            .unwrap())
        }
    }

    struct FakeProfiles {
        names_down: bool,
    }

    #[async_trait]
    impl ProfileSource for FakeProfiles {
        async fn resolve_username(&self, _uuid: &str) -> Result<String, UpstreamError> {
            if self.names_down {
                Err(transport_error())
            } else {
                Ok("Notch".to_string())
            }
        }

        async fn resolve_uuid(&self, _username: &str) -> Result<String, UpstreamError> {
            Ok("known".to_string())
        }

        async fn fetch_profile(&self, username: &str) -> Result<Value, UpstreamError> {
            if username == "ghost" {
                return Err(transport_error());
            }
            Ok(json!({ "name": username, "uuid": "069a79f4" }))
        }

        async fn fetch_skin(&self, username: &str) -> Result<Vec<u8>, UpstreamError> {
            if username == "ghost" {
                return Err(transport_error());
            }
            Ok(PNG_MAGIC.to_vec())
        }
    }

    fn state_with(stats: FakeStats, profiles: FakeProfiles) -> AppState {
        AppState::new(Arc::new(stats), Arc::new(profiles), &Config::default())
    }

    fn default_state() -> AppState {
        let kills: Vec<Vec<LeaderboardEntry>> = vec![
            (1..=30).map(|n| entry(&format!("k{}", n), 100 - n)).collect(),
            (31..=47).map(|n| entry(&format!("k{}", n), 100 - n)).collect(),
        ];
        let xp = vec![vec![entry("x1", 1), entry("x2", 1)]];

        state_with(
            FakeStats {
                pages: [(SortKey::Kills, kills), (SortKey::Experience, xp)]
                    .into_iter()
                    .collect(),
                fail_at: None,
                transport_down: false,
            },
            FakeProfiles { names_down: false },
        )
    }

    fn lb_params(sort: Option<&str>, page: Option<&str>) -> Query<LeaderboardParams> {
        Query(LeaderboardParams {
            sort: sort.map(String::from),
            page: page.map(String::from),
        })
    }

    #[tokio::test]
    async fn test_leaderboard_pages() {
        let Json(page) = leaderboard(State(default_state()), lb_params(None, None))
            .await
            .unwrap();
        assert_eq!(page.page, 1);
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.total_players, 47);
        assert!(page.complete);
        assert_eq!(page.leaderboard.len(), 20);
        assert_eq!(page.leaderboard[0].player_id, "k1");

        let Json(page) = leaderboard(State(default_state()), lb_params(Some("kills"), Some("3")))
            .await
            .unwrap();
        assert_eq!(page.leaderboard.len(), 7);
        assert_eq!(page.leaderboard[0].player_id, "k41");
    }

    #[tokio::test]
    async fn test_leaderboard_defaults_and_clamping() {
        let Json(page) = leaderboard(State(default_state()), lb_params(Some("bogus"), Some("abc")))
            .await
            .unwrap();
        assert_eq!(page.page, 1);
        assert_eq!(page.total_players, 47);

        let Json(page) = leaderboard(State(default_state()), lb_params(None, Some("99")))
            .await
            .unwrap();
        assert_eq!(page.page, 3);

        let Json(page) = leaderboard(State(default_state()), lb_params(Some("xp"), None))
            .await
            .unwrap();
        assert_eq!(page.total_players, 2);
        assert_eq!(page.total_pages, 1);
    }

    #[tokio::test]
    async fn test_leaderboard_empty_upstream() {
        let Json(page) = leaderboard(State(default_state()), lb_params(Some("deaths"), Some("2")))
            .await
            .unwrap();
        assert_eq!(page.page, 2);
        assert_eq!(page.total_pages, 0);
        assert_eq!(page.total_players, 0);
        assert!(page.leaderboard.is_empty());

        let json = serde_json::to_value(&page).unwrap();
        assert_eq!(
            json,
            json!({"page": 2, "totalPages": 0, "totalPlayers": 0, "complete": true, "leaderboard": []})
        );
    }

    #[tokio::test]
    async fn test_leaderboard_partial_failure_is_not_an_error() {
        let state = state_with(
            FakeStats {
                pages: [(SortKey::Kills, vec![vec![entry("a", 3)], vec![entry("b", 2)]])]
                    .into_iter()
                    .collect(),
                fail_at: Some(2),
                transport_down: false,
            },
            FakeProfiles { names_down: false },
        );

        let Json(page) = leaderboard(State(state), lb_params(None, None)).await.unwrap();
        assert_eq!(page.total_players, 1);
        assert!(!page.complete);
    }

    #[tokio::test]
    async fn test_leaderboard_transport_failure() {
        let state = state_with(
            FakeStats {
                pages: HashMap::new(),
                fail_at: None,
                transport_down: true,
            },
            FakeProfiles { names_down: false },
        );

        let err = leaderboard(State(state), lb_params(None, None)).await.unwrap_err();
        assert!(matches!(err, ApiError::Leaderboard(_)));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.to_string(), "Failed to fetch leaderboard");
    }

    #[tokio::test]
    async fn test_player_details() {
        let params = Query(PlayerIdParams {
            id: Some("known".to_string()),
        });
        let Json(details) = player_details(State(default_state()), params).await.unwrap();
        assert_eq!(details.uuid, "known");
        assert_eq!(details.name, "Notch");
        assert_eq!(details.killstreak, 2);
        assert_eq!(details.peak_killstreak, 9);
        assert_eq!(details.bounty, 15);
    }

    #[tokio::test]
    async fn test_player_details_without_name() {
        let state = state_with(
            FakeStats {
                pages: HashMap::new(),
                fail_at: None,
                transport_down: false,
            },
            FakeProfiles { names_down: true },
        );
        let params = Query(PlayerIdParams {
            id: Some("known".to_string()),
        });
        let Json(details) = player_details(State(state), params).await.unwrap();
        assert_eq!(details.name, "Unknown Player");
    }

    #[tokio::test]
    async fn test_player_details_uses_name_from_stats() {
        let state = state_with(
            FakeStats {
                pages: HashMap::new(),
                fail_at: None,
                transport_down: false,
            },
            FakeProfiles { names_down: true },
        );
        let params = Query(PlayerIdParams {
            id: Some("named".to_string()),
        });
        let Json(details) = player_details(State(state), params).await.unwrap();
        assert_eq!(details.name, "Dream");
        assert_eq!(details.kills, 1);
    }

    #[tokio::test]
    async fn test_player_details_errors() {
        let missing = player_details(State(default_state()), Query(PlayerIdParams::default()))
            .await
            .unwrap_err();
        assert_eq!(missing.status(), StatusCode::BAD_REQUEST);
        assert_eq!(missing.to_string(), "Player ID is required");

        let unknown = player_details(
            State(default_state()),
            Query(PlayerIdParams {
                id: Some("nobody".to_string()),
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(unknown.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(unknown.to_string(), "Failed to fetch player details");
    }

    #[tokio::test]
    async fn test_player_stats_passthrough() {
        let Json(stats) = player_stats(State(default_state()), Path("known".to_string()))
            .await
            .unwrap();
        assert_eq!(stats.player_id, "known");
        assert_eq!(stats.hero_experience(), vec![("aang".to_string(), 10)]);

        let err = player_stats(State(default_state()), Path("nobody".to_string()))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::PlayerDetails(_)));
    }

    fn mc_params(username: Option<&str>, kind: Option<&str>) -> Query<MinecraftParams> {
        Query(MinecraftParams {
            username: username.map(String::from),
            kind: kind.map(String::from),
        })
    }

    #[tokio::test]
    async fn test_minecraft_profile() {
        let response = minecraft(State(default_state()), mc_params(Some("Notch"), Some("profile")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let profile: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(profile["name"], "Notch");
    }

    #[tokio::test]
    async fn test_minecraft_skin() {
        let response = minecraft(State(default_state()), mc_params(Some("Notch"), Some("skin")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "image/png");
        assert_eq!(
            response.headers()[header::CACHE_CONTROL],
            "public, max-age=3600"
        );

        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], &PNG_MAGIC[..]);
    }

    #[tokio::test]
    async fn test_minecraft_errors() {
        let missing = minecraft(State(default_state()), mc_params(Some("Notch"), None))
            .await
            .unwrap_err();
        assert_eq!(missing.to_string(), "Username and type are required");
        assert_eq!(missing.status(), StatusCode::BAD_REQUEST);

        let invalid = minecraft(State(default_state()), mc_params(Some("Notch"), Some("cape")))
            .await
            .unwrap_err();
        assert_eq!(invalid.to_string(), "Invalid type");

        let upstream = minecraft(State(default_state()), mc_params(Some("ghost"), Some("skin")))
            .await
            .unwrap_err();
        assert_eq!(upstream.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(upstream.to_string(), "Failed to fetch Minecraft data");
    }

    #[tokio::test]
    async fn test_health() {
        let Json(body) = health().await;
        assert_eq!(body["status"], "ok");
    }
}
