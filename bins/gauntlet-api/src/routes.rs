use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use crate::handlers;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/submissions", post(handlers::submit_level))
        .route("/levels/current", get(handlers::current_level))
        .route("/hints", get(handlers::level_hints))
        .route("/leaderboard", get(handlers::get_leaderboard))
        .route("/health", get(handlers::health_check))
}
