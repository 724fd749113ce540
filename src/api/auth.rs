use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use validator::Validate;

use crate::api::errors::ApiError;
use crate::core::config::Settings;
use crate::core::redis::RateLimit;
use crate::core::{metrics, security, state::AppState};
use crate::repositories::refresh_tokens;
use crate::schemas::auth::{LoginRequest, RefreshRequest, TokenResponse};

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/login", post(login))
        .route("/refresh", post(refresh).get(refresh))
        .route("/logout", post(logout))
}

fn request_host(headers: &HeaderMap) -> &str {
    headers
        .get(header::HOST)
        .and_then(|value| value.to_str().ok())
        .and_then(|host| host.split(':').next())
        .unwrap_or_default()
}

pub(crate) fn cookie_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value)
        .filter(|value| !value.is_empty())
}

/// `host` is `domain` itself or one of its subdomains. A host that merely
/// ends with the same letters does not qualify.
fn within_cookie_domain(host: &str, domain: &str) -> bool {
    let domain = domain.trim_start_matches('.');
    if domain.is_empty() {
        return false;
    }
    let host = host.to_ascii_lowercase();
    let domain = domain.to_ascii_lowercase();
    host == domain || host.strip_suffix(domain.as_str()).is_some_and(|rest| rest.ends_with('.'))
}

fn session_cookie(settings: &Settings, host: &str, value: &str, max_age: u64) -> String {
    let cookies = settings.cookies();
    let mut cookie = format!(
        "{}={}; Max-Age={}; Path=/; HttpOnly; Secure; SameSite={}",
        cookies.name, value, max_age, cookies.same_site
    );
    if within_cookie_domain(host, &cookies.shared_domain) {
        let domain = cookies.shared_domain.trim_start_matches('.');
        cookie.push_str(&format!("; Domain=.{domain}"));
    }
    cookie
}

fn issue_tokens(settings: &Settings, user_id: &str) -> Result<(String, String), ApiError> {
    let access = security::create_access_token(user_id, settings, None)
        .map_err(|e| ApiError::internal(e, "Failed to create access token"))?;
    let refresh = security::create_refresh_token(user_id, settings)
        .map_err(|e| ApiError::internal(e, "Failed to create refresh token"))?;
    Ok((access, refresh))
}

async fn token_response(
    state: &AppState,
    headers: &HeaderMap,
    user_id: &str,
) -> Result<Response, ApiError> {
    let settings = state.settings();
    let (access_token, refresh_token) = issue_tokens(settings, user_id)?;
    refresh_tokens::store_token(state.store(), user_id, &refresh_token).await?;

    let cookie = session_cookie(
        settings,
        request_host(headers),
        &refresh_token,
        settings.security().refresh_token_ttl_seconds,
    );
    let body = TokenResponse {
        access_token,
        refresh_token,
        token_type: "bearer",
        expires_in: settings.security().access_token_ttl_seconds,
    };

    Ok(([(header::SET_COOKIE, cookie)], Json(body)).into_response())
}

fn credentials_match(settings: &Settings, user_id: &str, password: &str) -> bool {
    let credentials = &settings.security().credentials;
    let Some(hash) = credentials.get(user_id).or_else(|| credentials.get(&user_id.to_lowercase()))
    else {
        return false;
    };
    security::verify_password(password, hash).unwrap_or(false)
}

async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Option<Json<LoginRequest>>,
) -> Result<Response, ApiError> {
    let Json(payload) = payload.unwrap_or_default();
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let (Some(user_id), Some(password)) = (payload.identity(), payload.secret()) else {
        metrics::record_auth("login", "rejected");
        return Err(ApiError::Unauthorized("invalid credentials"));
    };

    let allowed = state.redis().allow_attempt("login", user_id, RateLimit::LOGIN).await;
    if !allowed {
        metrics::record_auth("login", "throttled");
        return Err(ApiError::TooManyRequests("Too many login attempts, try again later"));
    }

    if !credentials_match(state.settings(), user_id, password) {
        tracing::info!("Login rejected");
        metrics::record_auth("login", "rejected");
        return Err(ApiError::Unauthorized("invalid credentials"));
    }

    metrics::record_auth("login", "accepted");
    token_response(&state, &headers, user_id).await
}

async fn refresh(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Option<Json<RefreshRequest>>,
) -> Result<Response, ApiError> {
    let from_body = payload.and_then(|Json(body)| body.refresh_token).filter(|t| !t.is_empty());
    let cookie_name = state.settings().cookies().name.clone();
    let Some(token) = from_body.or_else(|| cookie_value(&headers, &cookie_name).map(str::to_string))
    else {
        return Err(ApiError::Unauthorized("missing refresh token"));
    };

    let claims = security::verify_refresh_token(&token, state.settings()).map_err(|_| {
        metrics::record_auth("refresh", "rejected");
        ApiError::Unauthorized("invalid refresh token")
    })?;

    if !refresh_tokens::matches(state.store(), &claims.sub, &token).await? {
        tracing::warn!("Refresh token reuse detected; revoking stored token");
        refresh_tokens::revoke(state.store(), &claims.sub).await?;
        metrics::record_auth("refresh", "revoked");
        return Err(ApiError::Unauthorized("invalid refresh token"));
    }

    metrics::record_auth("refresh", "accepted");
    token_response(&state, &headers, &claims.sub).await
}

async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Result<Response, ApiError> {
    let settings = state.settings();
    if let Some(token) = cookie_value(&headers, &settings.cookies().name) {
        if let Ok(claims) = security::verify_refresh_token(token, settings) {
            refresh_tokens::revoke(state.store(), &claims.sub).await?;
        }
    }

    let cleared = session_cookie(settings, request_host(&headers), "", 0);
    Ok((StatusCode::NO_CONTENT, [(header::SET_COOKIE, cleared)]).into_response())
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Method, Request};
    use serde_json::json;
    use tower::ServiceExt;

    use super::*;
    use crate::api::router::router;
    use crate::core::security::hash_password;
    use crate::test_support::{json_request, read_json, test_settings_with, test_state_with};

    fn app_with_user(user: &str, password: &str) -> (AppState, Router) {
        let hash = hash_password(password).expect("hash");
        let mut entries = serde_json::Map::new();
        entries.insert(user.to_string(), json!(hash));
        let credentials = serde_json::Value::Object(entries).to_string();
        let settings = test_settings_with(&[("AUTH_USER_CREDENTIALS", credentials.as_str())]);
        let state = test_state_with(settings);
        let app = router(state.clone());
        (state, app)
    }

    fn set_cookie(response: &Response) -> String {
        response.headers()[header::SET_COOKIE].to_str().expect("cookie").to_string()
    }

    #[test]
    fn shared_domain_only_covers_real_subdomains() {
        let settings = test_settings_with(&[("COOKIE_SHARED_DOMAIN", "falowen.app")]);

        for host in ["falowen.app", "api.falowen.app", "API.Falowen.App"] {
            let cookie = session_cookie(&settings, host, "token", 60);
            assert!(cookie.contains("; Domain=.falowen.app"), "{host}");
        }
        for host in ["evilfalowen.app", "falowen.app.evil.com", "localhost", ""] {
            let cookie = session_cookie(&settings, host, "token", 60);
            assert!(!cookie.contains("Domain="), "{host}");
        }
    }

    #[test]
    fn cookie_value_reads_named_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, "theme=dark; session=abc.def".parse().unwrap());
        assert_eq!(cookie_value(&headers, "session"), Some("abc.def"));
        assert_eq!(cookie_value(&headers, "missing"), None);
    }

    #[tokio::test]
    async fn login_rejects_unknown_user() {
        let (_, app) = app_with_user("ama@falowen.app", "correct horse");
        let response = app
            .oneshot(json_request(
                Method::POST,
                "/auth/login",
                None,
                Some(json!({"user_id": "kofi", "password": "correct horse"})),
            ))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = read_json(response).await;
        assert_eq!(body["detail"], "invalid credentials");
    }

    #[tokio::test]
    async fn login_without_body_is_unauthorized() {
        let (_, app) = app_with_user("ama", "pw");
        let response = app
            .oneshot(
                Request::builder().method(Method::POST).uri("/auth/login").body(Body::empty()).unwrap(),
            )
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn login_refresh_and_logout_round() {
        let (state, app) = app_with_user("ama@falowen.app", "correct horse");

        let response = app
            .clone()
            .oneshot(json_request(
                Method::POST,
                "/auth/login",
                None,
                Some(json!({"email": "AMA@falowen.app", "pw": "correct horse"})),
            ))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        let cookie = set_cookie(&response);
        assert!(cookie.starts_with("session="));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("SameSite=Lax"));
        let body = read_json(response).await;
        assert_eq!(body["expires_in"], 3600);
        let first_refresh = body["refresh_token"].as_str().expect("refresh").to_string();

        let rotated = app
            .clone()
            .oneshot(
                Request::builder()
                    .method(Method::GET)
                    .uri("/auth/refresh")
                    .header(header::COOKIE, format!("session={first_refresh}"))
                    .header(header::HOST, "api.falowen.app")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .expect("response");
        assert_eq!(rotated.status(), StatusCode::OK);
        assert!(set_cookie(&rotated).contains("Domain=.falowen.app"));
        let second_refresh =
            read_json(rotated).await["refresh_token"].as_str().expect("refresh").to_string();

        let reused = app
            .clone()
            .oneshot(json_request(
                Method::POST,
                "/auth/refresh",
                None,
                Some(json!({"refresh_token": first_refresh})),
            ))
            .await
            .expect("response");
        assert_eq!(reused.status(), StatusCode::UNAUTHORIZED);
        assert!(!refresh_tokens::matches(state.store(), "AMA@falowen.app", &second_refresh)
            .await
            .unwrap());

        let logout = app
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri("/auth/logout")
                    .header(header::COOKIE, format!("session={second_refresh}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .expect("response");
        assert_eq!(logout.status(), StatusCode::NO_CONTENT);
        assert!(set_cookie(&logout).contains("Max-Age=0"));
    }

    #[tokio::test]
    async fn refresh_without_token_is_unauthorized() {
        let (_, app) = app_with_user("ama", "pw");
        let response = app
            .oneshot(json_request(Method::POST, "/auth/refresh", None, Some(json!({}))))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(read_json(response).await["detail"], "missing refresh token");
    }
}
