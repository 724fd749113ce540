use axum::{
    extract::{Path, State},
    routing::{get, put},
    Json, Router,
};
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::guards::CurrentUser;
use crate::core::state::AppState;
use crate::repositories::topic_coach::{self, TopicCoachChat};
use crate::schemas::topic_coach::{SaveTopicCoachRequest, SaveTopicCoachResponse, TopicCoachResponse};
use crate::services::session_state::{initialise_topic_coach_session_state, SessionState};

pub(crate) fn router() -> Router<AppState> {
    Router::new().route("/", put(save)).route("/:level", get(load))
}

async fn load(
    State(state): State<AppState>,
    CurrentUser { student_code }: CurrentUser,
    Path(level): Path<String>,
) -> Result<Json<TopicCoachResponse>, ApiError> {
    let chat = topic_coach::load(state.store(), &student_code).await?;

    let mut session = SessionState::new();
    let keys = initialise_topic_coach_session_state(
        &mut session,
        &student_code,
        &level,
        chat.messages,
        chat.qcount,
        chat.finalized,
    );

    Ok(Json(TopicCoachResponse { keys, state: session }))
}

async fn save(
    State(state): State<AppState>,
    CurrentUser { student_code }: CurrentUser,
    Json(payload): Json<SaveTopicCoachRequest>,
) -> Result<Json<SaveTopicCoachResponse>, ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let chat = TopicCoachChat {
        messages: payload.messages,
        qcount: payload.qcount,
        finalized: payload.finalized,
    };
    let saved = topic_coach::persist(state.store(), &student_code, &chat).await;
    Ok(Json(SaveTopicCoachResponse { saved }))
}
