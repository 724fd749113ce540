use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::guards::CurrentUser;
use crate::core::{metrics, state::AppState};
use crate::repositories::announcements::{self, CreateAnnouncement};
use crate::schemas::announcement::{
    AnnouncementQuery, AnnouncementResponse, CreateAnnouncementRequest,
};

pub(crate) fn router() -> Router<AppState> {
    Router::new().route("/", get(list).post(create))
}

/// Announcements never fail the page: a store error yields an empty list.
async fn list(
    State(state): State<AppState>,
    Query(query): Query<AnnouncementQuery>,
) -> Json<Vec<AnnouncementResponse>> {
    match announcements::list(state.store(), query.level.as_deref()).await {
        Ok(docs) => Json(docs.iter().map(AnnouncementResponse::from_document).collect()),
        Err(err) => {
            tracing::warn!(error = %err, "Failed to load announcements");
            metrics::record_external_fallback("announcements");
            Json(Vec::new())
        }
    }
}

async fn create(
    State(state): State<AppState>,
    _user: CurrentUser,
    Json(payload): Json<CreateAnnouncementRequest>,
) -> Result<(StatusCode, Json<AnnouncementResponse>), ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let doc = announcements::create(
        state.store(),
        CreateAnnouncement {
            title: &payload.title,
            body: &payload.body,
            level: payload.level.as_deref(),
            pinned: payload.pinned,
        },
    )
    .await?;

    Ok((StatusCode::CREATED, Json(AnnouncementResponse::from_document(&doc))))
}
