use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    routing::post,
    Json, Router,
};
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::guards::CurrentUser;
use crate::core::{security, state::AppState};
use crate::repositories::sessions;
use crate::schemas::session::{
    CreateSessionRequest, SessionResponse, SessionTokenRequest, SessionTokenResponse,
};

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create))
        .route("/validate", post(validate))
        .route("/refresh", post(refresh))
        .route("/destroy", post(destroy))
}

/// Sessions are bound to a digest of the client's user agent.
fn ua_hash(headers: &HeaderMap) -> String {
    headers
        .get(header::USER_AGENT)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.trim().is_empty())
        .map(security::token_digest)
        .unwrap_or_default()
}

async fn create(
    State(state): State<AppState>,
    CurrentUser { student_code }: CurrentUser,
    headers: HeaderMap,
    Json(payload): Json<CreateSessionRequest>,
) -> Result<(StatusCode, Json<SessionTokenResponse>), ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let token = sessions::create_session_token(
        state.store(),
        state.settings().sessions(),
        &student_code,
        &payload.name,
        &ua_hash(&headers),
    )
    .await?;

    Ok((StatusCode::CREATED, Json(SessionTokenResponse { token })))
}

async fn validate(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<SessionTokenRequest>,
) -> Result<Json<SessionResponse>, ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let session =
        sessions::validate_session_token(state.store(), &payload.token, &ua_hash(&headers)).await?;
    Ok(Json(SessionResponse { valid: session.is_some(), session }))
}

async fn refresh(
    State(state): State<AppState>,
    Json(payload): Json<SessionTokenRequest>,
) -> Result<Json<SessionTokenResponse>, ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let token = sessions::refresh_or_rotate_session_token(
        state.store(),
        state.settings().sessions(),
        &payload.token,
    )
    .await?;
    Ok(Json(SessionTokenResponse { token }))
}

async fn destroy(
    State(state): State<AppState>,
    Json(payload): Json<SessionTokenRequest>,
) -> Result<StatusCode, ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;
    sessions::destroy_session_token(state.store(), &payload.token).await?;
    Ok(StatusCode::NO_CONTENT)
}
