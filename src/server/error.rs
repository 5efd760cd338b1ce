//! Error responses of the JSON API.

use crate::upstream::UpstreamError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::error;

/// Every way an API handler can fail. The display text is what the client
/// sees in `{"error": ...}`; upstream details only go to the log.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(&'static str),

    #[error("Failed to fetch leaderboard")]
    Leaderboard(#[source] UpstreamError),

    #[error("Failed to fetch player details")]
    PlayerDetails(#[source] UpstreamError),

    #[error("Failed to fetch Minecraft data")]
    Minecraft(#[source] UpstreamError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Leaderboard(_) | ApiError::PlayerDetails(_) | ApiError::Minecraft(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Leaderboard(ref e)
            | ApiError::PlayerDetails(ref e)
            | ApiError::Minecraft(ref e) => error!("{}: {}", self, e),
            ApiError::BadRequest(_) => {}
        }

        (self.status(), Json(json!({ "error": self.to_string() }))).into_response()
    }
}
