use axum::{
    extract::State,
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};

use crate::api::errors::ApiError;
use crate::api::guards::CurrentUser;
use crate::core::metrics;
use crate::core::state::AppState;
use crate::core::time::now_utc;
use crate::repositories::students::{self, StudentProfile};
use crate::schemas::student::PaymentSummaryResponse;
use crate::services::currency::format_cedis;
use crate::services::receipt::{payment_status, receipt_text, render_receipt_pdf};

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/me/payment", get(payment_summary))
        .route("/me/receipt", get(payment_receipt))
}

async fn load_profile(state: &AppState, student_code: &str) -> Result<StudentProfile, ApiError> {
    students::fetch_profile(state.store(), student_code)
        .await?
        .ok_or_else(|| ApiError::NotFound("Student not found".to_string()))
}

async fn payment_summary(
    State(state): State<AppState>,
    CurrentUser { student_code }: CurrentUser,
) -> Result<Json<PaymentSummaryResponse>, ApiError> {
    let profile = load_profile(&state, &student_code).await?;

    Ok(Json(PaymentSummaryResponse {
        status: payment_status(profile.balance),
        amount_paid: format_cedis(profile.paid),
        balance: format_cedis(profile.balance),
        fully_paid: profile.balance <= 0.0,
        student_code: profile.student_code,
        name: profile.name,
        level: profile.level,
        contract_start: profile.contract_start,
    }))
}

/// Receipt as a PDF download, or as plain text when rendering fails.
async fn payment_receipt(
    State(state): State<AppState>,
    CurrentUser { student_code }: CurrentUser,
) -> Result<Response, ApiError> {
    let profile = load_profile(&state, &student_code).await?;
    let receipt_date = now_utc().date().to_string();

    let pdf = match render_receipt_pdf(&profile, &receipt_date) {
        Ok(pdf) => pdf,
        Err(err) => {
            tracing::warn!(error = %err, "Receipt PDF unavailable, sending text receipt");
            metrics::record_external_fallback("receipt_pdf");
            let mut response =
                (StatusCode::OK, receipt_text(&profile, &receipt_date)).into_response();
            response
                .headers_mut()
                .insert(header::CONTENT_TYPE, HeaderValue::from_static("text/plain; charset=utf-8"));
            return Ok(response);
        }
    };

    let safe_code: String = profile
        .student_code
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .collect();
    let disposition = format!("attachment; filename=\"receipt_{safe_code}.pdf\"");

    let mut response = (StatusCode::OK, pdf).into_response();
    response
        .headers_mut()
        .insert(header::CONTENT_TYPE, HeaderValue::from_static("application/pdf"));
    response.headers_mut().insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    response.headers_mut().insert(
        header::CONTENT_DISPOSITION,
        HeaderValue::from_str(&disposition)
            .unwrap_or_else(|_| HeaderValue::from_static("attachment")),
    );
    Ok(response)
}

#[cfg(test)]
mod tests {
    use axum::body::to_bytes;
    use axum::http::{header, Method, StatusCode};
    use serde_json::json;
    use tower::ServiceExt;

    use crate::db::{fields, CollectionPath};
    use crate::test_support::{bearer_token, json_request, read_json, test_app};

    #[tokio::test]
    async fn installment_summary_formats_cedis() {
        let (state, app) = test_app();
        let token = bearer_token("s1", state.settings());
        state
            .store()
            .set(
                &CollectionPath::root("students").doc("s1"),
                fields(json!({"name": "Ama", "level": "A1", "paid": 1500, "balance": 250.5})),
            )
            .await
            .unwrap();

        let response = app
            .oneshot(json_request(Method::GET, "/api/v1/students/me/payment", Some(&token), None))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        let body = read_json(response).await;
        assert_eq!(body["amount_paid"], "1,500.00 cedis");
        assert_eq!(body["balance"], "250.50 cedis");
        assert_eq!(body["status"], "Installment - Balance remaining 250.50 cedis");
        assert_eq!(body["fully_paid"], false);
    }

    #[tokio::test]
    async fn receipt_downloads_as_pdf() {
        let (state, app) = test_app();
        let token = bearer_token("s1", state.settings());
        state
            .store()
            .set(
                &CollectionPath::root("students").doc("s1"),
                fields(json!({"name": "Ama", "level": "A1", "paid": 1500, "balance": 0})),
            )
            .await
            .unwrap();

        let response = app
            .oneshot(json_request(Method::GET, "/api/v1/students/me/receipt", Some(&token), None))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/pdf");
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"receipt_s1.pdf\""
        );
        let body = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        assert!(body.starts_with(b"%PDF"));
    }

    #[tokio::test]
    async fn unknown_student_is_not_found() {
        let (state, app) = test_app();
        let token = bearer_token("ghost", state.settings());

        let response = app
            .oneshot(json_request(Method::GET, "/api/v1/students/me/payment", Some(&token), None))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
