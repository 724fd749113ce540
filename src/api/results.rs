use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};

use crate::api::errors::ApiError;
use crate::api::guards::CurrentUser;
use crate::core::state::AppState;
use crate::repositories::scores;
use crate::schemas::results::{LeaderboardResponse, VideoListResponse};
use crate::services::leaderboard::build_leaderboard;
use crate::services::youtube::fetch_level_videos;

pub(crate) fn leaderboard_router() -> Router<AppState> {
    Router::new().route("/:level", get(leaderboard))
}

pub(crate) fn videos_router() -> Router<AppState> {
    Router::new().route("/:level", get(videos))
}

async fn leaderboard(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(level): Path<String>,
) -> Result<Json<LeaderboardResponse>, ApiError> {
    let level = level.trim().to_uppercase();
    let rows = scores::leaderboard_rows(state.store()).await?;
    let entries = build_leaderboard(rows, &level);
    Ok(Json(LeaderboardResponse { level, entries }))
}

async fn videos(
    State(state): State<AppState>,
    Path(level): Path<String>,
) -> Json<VideoListResponse> {
    let level = level.trim().to_uppercase();
    let videos = fetch_level_videos(state.http(), &state.settings().youtube().api_key, &level).await;
    Json(VideoListResponse { level, videos })
}
