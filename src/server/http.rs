use anyhow::{Context, Result};
use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::config::{Config, LeaderboardConfig, ServerConfig};
use crate::leaderboard::{AggregatorConfig, QueryDefaults};
use crate::upstream::{ProfileSource, StatsSource};

use super::handlers::{health, leaderboard, minecraft, player_details, player_stats};

/// Leaderboard settings shared by every request.
#[derive(Debug, Clone)]
pub struct LeaderboardSettings {
    pub page_size: usize,
    pub aggregator: AggregatorConfig,
    pub defaults: QueryDefaults,
}

impl From<&LeaderboardConfig> for LeaderboardSettings {
    fn from(config: &LeaderboardConfig) -> Self {
        Self {
            page_size: config.page_size,
            aggregator: AggregatorConfig::from(config),
            defaults: QueryDefaults {
                sort: config.default_sort,
                page: 1,
            },
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub stats: Arc<dyn StatsSource>,
    pub profiles: Arc<dyn ProfileSource>,
    pub leaderboard: Arc<LeaderboardSettings>,
}

impl AppState {
    pub fn new(
        stats: Arc<dyn StatsSource>,
        profiles: Arc<dyn ProfileSource>,
        config: &Config,
    ) -> AppState {
        AppState {
            stats,
            profiles,
            leaderboard: Arc::new(LeaderboardSettings::from(&config.leaderboard)),
        }
    }
}

pub struct WebRouter {}

impl WebRouter {
    pub fn router(state: AppState) -> Router {
        Router::new()
            .route("/health", get(health))
            .route("/api/leaderboard", get(leaderboard))
            .route("/api/player-details", get(player_details))
            .route("/api/player-details/{id}", get(player_stats))
            .route("/api/minecraft", get(minecraft))
            .with_state(state)
            .layer(TraceLayer::new_for_http())
    }

    pub async fn serve(state: AppState, config: &ServerConfig) -> Result<()> {
        let addr = format!("{}:{}", config.bind, config.port);
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .with_context(|| format!("Failed to bind {}", addr))?;

        info!("HTTP Server started, listening on http://{}", addr);

        axum::serve(listener, Self::router(state))
            .with_graceful_shutdown(shutdown_signal())
            .await
            .context("HTTP server error")?;

        info!("HTTP Server stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
    }
}
