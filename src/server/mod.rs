//! JSON HTTP API.
//!
//! Routes:
//! - `GET /api/leaderboard?sort=&page=`
//! - `GET /api/player-details?id=` and `GET /api/player-details/{id}`
//! - `GET /api/minecraft?username=&type=profile|skin`
//! - `GET /health`

mod error;
mod handlers;
mod http;

pub use http::{AppState, WebRouter};
