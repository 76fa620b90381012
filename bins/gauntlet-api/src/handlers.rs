// HTTP route handlers for the Gauntlet API.
//
// Handlers translate between the wire envelope and the core services;
// no game logic lives here. The authenticated team id arrives in the
// `x-team-id` header, placed there by the upstream gateway that owns
// session tokens.

use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::error;
use uuid::Uuid;

use gauntlet_core::error::GameError;
use gauntlet_core::leaderboard;
use gauntlet_core::types::Level;

use crate::AppState;

pub const TEAM_ID_HEADER: &str = "x-team-id";

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

fn ok<T: Serialize>(message: &str, data: T) -> Response {
    (
        StatusCode::OK,
        Json(ApiResponse {
            success: true,
            message: message.to_string(),
            data: Some(data),
        }),
    )
        .into_response()
}

fn fail(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(ApiResponse::<()> {
            success: false,
            message: message.to_string(),
            data: None,
        }),
    )
        .into_response()
}

/// Caller-facing status for a core error. Internal detail (store
/// errors) is logged, never echoed back.
fn error_response(err: GameError) -> Response {
    match &err {
        GameError::NotFound(what) => fail(StatusCode::NOT_FOUND, &format!("{} not found", what)),
        GameError::Validation(msg) => fail(StatusCode::BAD_REQUEST, msg),
        GameError::StateConflict(msg) => fail(StatusCode::BAD_REQUEST, msg),
        GameError::Store(_) => {
            error!(error = %err, "Request aborted by store failure");
            fail(StatusCode::INTERNAL_SERVER_ERROR, "internal error")
        }
    }
}

fn team_id_from_headers(headers: &HeaderMap) -> Result<Uuid, Response> {
    headers
        .get(TEAM_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| Uuid::parse_str(v).ok())
        .ok_or_else(|| fail(StatusCode::UNAUTHORIZED, "missing or invalid team identity"))
}

#[derive(Debug, Deserialize)]
pub struct SubmitRequest {
    pub code: String,
}

/// POST /submissions - evaluate the team's code for its current level.
pub async fn submit_level(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<SubmitRequest>,
) -> Response {
    let team_id = match team_id_from_headers(&headers) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match state.service.submit(team_id, &payload.code).await {
        Ok(outcome) => {
            let message = if outcome.all_passed {
                "All test cases passed!"
            } else {
                "Some test cases failed"
            };
            ok(message, outcome)
        }
        Err(e) => error_response(e),
    }
}

/// The level as shown to a playing team: no test cases, no hints.
#[derive(Debug, Serialize)]
pub struct LevelView {
    pub id: Uuid,
    pub level_number: u32,
    pub title: String,
    pub description: String,
    pub language_id: u32,
    pub language: String,
    pub code_template: String,
    pub difficulty_score: u32,
}

impl From<Level> for LevelView {
    fn from(level: Level) -> Self {
        Self {
            id: level.id,
            level_number: level.level_number,
            title: level.title,
            description: level.description,
            language_id: level.language_id,
            language: level.language,
            code_template: level.code_template,
            difficulty_score: level.difficulty_score,
        }
    }
}

/// Current-level payload: the playable level (absent once every level
/// is cleared) plus progress through the level list.
#[derive(Debug, Serialize)]
pub struct CurrentLevelView {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<LevelView>,
    pub total_levels: u64,
    pub more_levels: bool,
}

/// GET /levels/current - fetch (and open) the team's current level.
pub async fn current_level(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Response {
    let team_id = match team_id_from_headers(&headers) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match state.service.open_level(team_id).await {
        Ok(current) => {
            let message = if current.level.is_some() {
                "Current level fetched"
            } else {
                "All levels completed"
            };
            ok(
                message,
                CurrentLevelView {
                    level: current.level.map(LevelView::from),
                    total_levels: current.total_levels,
                    more_levels: current.more_levels,
                },
            )
        }
        Err(e) => error_response(e),
    }
}

/// GET /hints - hints for the current level, at a score cost.
pub async fn level_hints(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    let team_id = match team_id_from_headers(&headers) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match state.service.take_hints(team_id).await {
        Ok(hints) if hints.is_empty() => ok("No hints available for this level", hints),
        Ok(hints) => ok("Hints fetched", hints),
        Err(e) => error_response(e),
    }
}

#[derive(Debug, Deserialize)]
pub struct LeaderboardParams {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_limit")]
    pub limit: u32,
}

fn default_page() -> u32 {
    1
}

fn default_limit() -> u32 {
    10
}

/// GET /leaderboard - ranked teams, paginated.
pub async fn get_leaderboard(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(params): Query<LeaderboardParams>,
) -> Response {
    let team_id = match team_id_from_headers(&headers) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match leaderboard::leaderboard(&state.repo, team_id, params.page, params.limit).await {
        Ok(page) => ok("Leaderboard fetched", page),
        Err(e) => error_response(e),
    }
}

/// GET /health - liveness probe.
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
