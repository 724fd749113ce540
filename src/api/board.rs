use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::guards::CurrentUser;
use crate::core::state::AppState;
use crate::repositories::board::{self, CreateComment, CreatePost};
use crate::schemas::board::{BoardEntry, CreateCommentRequest, CreatePostRequest, PostListQuery};

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/:level/:class_name/posts", get(list_posts).post(create_post))
        .route(
            "/:level/:class_name/posts/:post_id/comments",
            get(list_comments).post(add_comment),
        )
}

async fn list_posts(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path((level, class_name)): Path<(String, String)>,
    Query(query): Query<PostListQuery>,
) -> Result<Json<Vec<BoardEntry>>, ApiError> {
    let docs =
        board::list_posts(state.store(), &level.to_uppercase(), &class_name, query.topic.as_deref())
            .await?;
    Ok(Json(docs.iter().map(BoardEntry::from_document).collect()))
}

async fn create_post(
    State(state): State<AppState>,
    CurrentUser { student_code }: CurrentUser,
    Path((level, class_name)): Path<(String, String)>,
    Json(payload): Json<CreatePostRequest>,
) -> Result<(StatusCode, Json<BoardEntry>), ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let doc = board::create_post(
        state.store(),
        &level.to_uppercase(),
        &class_name,
        CreatePost {
            student_code: &student_code,
            student_name: &payload.student_name,
            content: &payload.content,
            topic: payload.topic.as_deref(),
            chapter: payload.chapter.as_deref(),
        },
    )
    .await?;

    tracing::info!(level = %level, class_name = %class_name, post_id = %doc.id, "Class board post created");
    Ok((StatusCode::CREATED, Json(BoardEntry::from_document(&doc))))
}

async fn list_comments(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path((level, class_name, post_id)): Path<(String, String, String)>,
) -> Result<Json<Vec<BoardEntry>>, ApiError> {
    let docs = board::list_comments(state.store(), &level.to_uppercase(), &class_name, &post_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Post not found".to_string()))?;
    Ok(Json(docs.iter().map(BoardEntry::from_document).collect()))
}

async fn add_comment(
    State(state): State<AppState>,
    CurrentUser { student_code }: CurrentUser,
    Path((level, class_name, post_id)): Path<(String, String, String)>,
    Json(payload): Json<CreateCommentRequest>,
) -> Result<(StatusCode, Json<BoardEntry>), ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let doc = board::add_comment(
        state.store(),
        &level.to_uppercase(),
        &class_name,
        &post_id,
        CreateComment {
            student_code: &student_code,
            student_name: &payload.student_name,
            content: &payload.content,
        },
    )
    .await?
    .ok_or_else(|| ApiError::NotFound("Post not found".to_string()))?;

    Ok((StatusCode::CREATED, Json(BoardEntry::from_document(&doc))))
}
