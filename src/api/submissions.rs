use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::guards::CurrentUser;
use crate::core::state::AppState;
use crate::repositories::{scores, submissions};
use crate::schemas::submission::{
    StreakQuery, StreakResponse, SubmitAnswerRequest, SubmitAnswerResponse, SubmitStatusResponse,
};
use crate::services::submission_dates::{normalize_submission_dates, submission_streak};
use crate::services::submission_flow::{SubmissionFlow, SubmitOutcome, SubmitRequest};
use crate::services::submit_status::derive_submit_status;

const LEVELS: &[&str] = &["A1", "A2", "B1", "B2", "C1", "C2"];

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(submit))
        .route("/streak", get(streak))
        .route("/:level/:lesson_key/status", get(status))
}

async fn submit(
    State(state): State<AppState>,
    CurrentUser { student_code }: CurrentUser,
    Json(payload): Json<SubmitAnswerRequest>,
) -> Result<(StatusCode, Json<SubmitAnswerResponse>), ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;
    let level = payload.level.trim().to_uppercase();

    let flow = SubmissionFlow::new(state.store(), state.settings().coursework());
    let result = flow
        .submit(SubmitRequest {
            level: &level,
            day: payload.day,
            chapter: &payload.chapter,
            student_code: &student_code,
            student_name: &payload.student_name,
            answer: &payload.answer,
            lesson: &payload.lesson,
        })
        .await?;

    let status = match result.outcome {
        SubmitOutcome::AlreadySubmitted => StatusCode::OK,
        SubmitOutcome::Submitted | SubmitOutcome::Resubmitted => StatusCode::CREATED,
    };

    Ok((
        status,
        Json(SubmitAnswerResponse {
            outcome: result.outcome,
            submitted_on: result.submission.text_field("submitted_on"),
            submission_id: result.submission.id,
            lesson_key: result.lesson_key,
            state: result.state,
        }),
    ))
}

async fn status(
    State(state): State<AppState>,
    CurrentUser { student_code }: CurrentUser,
    Path((level, lesson_key)): Path<(String, String)>,
) -> Result<Json<SubmitStatusResponse>, ApiError> {
    let level = level.trim().to_uppercase();
    let store = state.store();

    let locked = submissions::is_locked(store, &level, &student_code, &lesson_key).await?;
    let latest = submissions::fetch_latest(store, &level, &student_code, &lesson_key).await?;
    let score = scores::fetch_latest_score(
        store,
        &student_code,
        &lesson_key,
        latest.as_ref().map(|doc| doc.id.as_str()),
    )
    .await?;

    let stored_needs_resubmit = latest.as_ref().map(|doc| doc.bool_field("needs_resubmit"));
    let status = derive_submit_status(
        locked,
        stored_needs_resubmit,
        latest.as_ref().map(|doc| &doc.fields),
        score.as_ref().map(|doc| &doc.fields),
        state.settings().coursework().pass_mark,
    );

    if status.clear_lock {
        submissions::release_lock(store, &level, &student_code, &lesson_key).await?;
        tracing::info!(level = %level, lesson_key = %lesson_key, "Lesson reopened for resubmission");
    }

    Ok(Json(SubmitStatusResponse {
        lesson_key,
        status,
        latest_submission_id: latest.map(|doc| doc.id),
    }))
}

async fn streak(
    State(state): State<AppState>,
    CurrentUser { student_code }: CurrentUser,
    Query(query): Query<StreakQuery>,
) -> Result<Json<StreakResponse>, ApiError> {
    let levels: Vec<String> = match query.level.as_deref().map(str::trim) {
        Some(level) if !level.is_empty() => vec![level.to_uppercase()],
        _ => LEVELS.iter().map(|level| level.to_string()).collect(),
    };

    let mut raw_dates = Vec::new();
    for level in &levels {
        let docs = submissions::list_for_student(state.store(), level, &student_code).await?;
        raw_dates.extend(docs.iter().map(|doc| doc.text_field("submitted_on").unwrap_or_default()));
    }
    let dates = normalize_submission_dates(&raw_dates);

    Ok(Json(StreakResponse {
        streak_days: submission_streak(&dates),
        last_submitted_on: dates.iter().flatten().max().map(|date| date.to_string()),
        student_code,
    }))
}

#[cfg(test)]
mod tests {
    use axum::http::Method;
    use serde_json::json;
    use tower::ServiceExt;

    use crate::db::fields;
    use crate::repositories::{scores, submissions};
    use crate::test_support::{bearer_token, json_request, read_json, test_app};

    fn submit_body(answer: &str) -> serde_json::Value {
        json!({
            "level": "a1",
            "day": 1,
            "chapter": "1.0",
            "student_name": "Ama",
            "answer": answer,
            "lesson": {"assignment": true, "chapter": "1.0"}
        })
    }

    #[tokio::test]
    async fn submit_requires_authentication() {
        let (_, app) = test_app();
        let response = app
            .oneshot(json_request(Method::POST, "/api/v1/submissions", None, Some(submit_body("x"))))
            .await
            .expect("response");
        assert_eq!(response.status(), axum::http::StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn submit_then_repeat_returns_existing() {
        let (state, app) = test_app();
        let token = bearer_token("s1", state.settings());
        let answer = "wort ".repeat(25);

        let first = app
            .clone()
            .oneshot(json_request(
                Method::POST,
                "/api/v1/submissions",
                Some(&token),
                Some(submit_body(&answer)),
            ))
            .await
            .expect("response");
        assert_eq!(first.status(), axum::http::StatusCode::CREATED);
        let first = read_json(first).await;
        assert_eq!(first["outcome"], "submitted");
        assert_eq!(first["lesson_key"], "A1_day1_ch1_0");
        assert_eq!(first["needs_resubmit"], false);

        let second = app
            .oneshot(json_request(
                Method::POST,
                "/api/v1/submissions",
                Some(&token),
                Some(submit_body(&answer)),
            ))
            .await
            .expect("response");
        assert_eq!(second.status(), axum::http::StatusCode::OK);
        let second = read_json(second).await;
        assert_eq!(second["outcome"], "already_submitted");
        assert_eq!(second["submission_id"], first["submission_id"]);
    }

    #[tokio::test]
    async fn status_reopens_lesson_after_failing_score() {
        let (state, app) = test_app();
        let token = bearer_token("s1", state.settings());
        let store = state.store();

        submissions::create(
            store,
            submissions::CreateSubmission {
                level: "A1",
                student_code: "s1",
                student_name: "Ama",
                lesson_key: "A1_day1_ch1_0",
                chapter: "1.0",
                answer: "Hallo",
                needs_resubmit: false,
                resubmission: false,
            },
        )
        .await
        .unwrap();
        submissions::acquire_lock(store, "A1", "s1", "A1_day1_ch1_0").await.unwrap();
        store
            .add(
                &scores::collection(),
                fields(json!({"student_code": "s1", "lesson_key": "A1_day1_ch1_0", "score": "40%"})),
            )
            .await
            .unwrap();

        let response = app
            .oneshot(json_request(
                Method::GET,
                "/api/v1/submissions/A1/A1_day1_ch1_0/status",
                Some(&token),
                None,
            ))
            .await
            .expect("response");
        assert_eq!(response.status(), axum::http::StatusCode::OK);
        let body = read_json(response).await;
        assert_eq!(body["status_label"], "Resubmission needed");
        assert_eq!(body["clear_lock"], true);

        let lock = crate::db::CollectionPath::root("submission_locks").doc("A1__s1__A1_day1_ch1_0");
        assert!(store.get(&lock).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn short_answer_stays_open_until_corrected() {
        let (state, app) = test_app();
        let token = bearer_token("s1", state.settings());
        let status_uri = "/api/v1/submissions/A1/A1_day1_ch1_0/status";

        let first = app
            .clone()
            .oneshot(json_request(
                Method::POST,
                "/api/v1/submissions",
                Some(&token),
                Some(submit_body("zu kurz")),
            ))
            .await
            .expect("response");
        let first = read_json(first).await;
        assert_eq!(first["needs_resubmit"], true);

        let pending = app
            .clone()
            .oneshot(json_request(Method::GET, status_uri, Some(&token), None))
            .await
            .expect("response");
        let pending = read_json(pending).await;
        assert_eq!(pending["status_label"], "Resubmission needed");
        assert_eq!(pending["locked"], false);

        let corrected = "wort ".repeat(25);
        let second = app
            .clone()
            .oneshot(json_request(
                Method::POST,
                "/api/v1/submissions",
                Some(&token),
                Some(submit_body(&corrected)),
            ))
            .await
            .expect("response");
        assert_eq!(second.status(), axum::http::StatusCode::CREATED);
        let second = read_json(second).await;
        assert_ne!(second["outcome"], "already_submitted");
        assert_ne!(second["submission_id"], first["submission_id"]);

        let reviewed = app
            .oneshot(json_request(Method::GET, status_uri, Some(&token), None))
            .await
            .expect("response");
        let reviewed = read_json(reviewed).await;
        assert_eq!(reviewed["status_label"], "In review");
        assert_eq!(reviewed["latest_submission_id"], second["submission_id"]);
    }

    #[tokio::test]
    async fn textual_completed_status_closes_the_lesson() {
        let (state, app) = test_app();
        let token = bearer_token("s1", state.settings());
        let store = state.store();

        submissions::create(
            store,
            submissions::CreateSubmission {
                level: "A1",
                student_code: "s1",
                student_name: "Ama",
                lesson_key: "A1_day1_ch1_0",
                chapter: "1.0",
                answer: "kurz",
                needs_resubmit: true,
                resubmission: false,
            },
        )
        .await
        .unwrap();
        store
            .add(
                &scores::collection(),
                fields(json!({
                    "student_code": "s1",
                    "lesson_key": "A1_day1_ch1_0",
                    "score": "",
                    "status": "Completed - resubmission not required"
                })),
            )
            .await
            .unwrap();

        let response = app
            .oneshot(json_request(
                Method::GET,
                "/api/v1/submissions/A1/A1_day1_ch1_0/status",
                Some(&token),
                None,
            ))
            .await
            .expect("response");
        let body = read_json(response).await;
        assert_eq!(body["status_label"], "Completed");
        assert_eq!(body["needs_resubmit"], false);
        assert_eq!(body["locked"], true);
    }

    #[tokio::test]
    async fn streak_counts_today() {
        let (state, app) = test_app();
        let token = bearer_token("s1", state.settings());
        let answer = "wort ".repeat(25);

        app.clone()
            .oneshot(json_request(
                Method::POST,
                "/api/v1/submissions",
                Some(&token),
                Some(submit_body(&answer)),
            ))
            .await
            .expect("response");

        let response = app
            .oneshot(json_request(Method::GET, "/api/v1/submissions/streak", Some(&token), None))
            .await
            .expect("response");
        let body = read_json(response).await;
        assert_eq!(body["student_code"], "s1");
        assert_eq!(body["streak_days"], 1);
    }
}
