use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request},
    Router,
};

use crate::api;
use crate::core::{config::Settings, redis::RedisHandle, security, state::AppState};
use crate::db::memory::MemoryDocumentStore;

const TEST_JWT_SECRET: &str = "test-secret";

/// Settings for tests, built from an explicit map so the process environment
/// is never read or mutated.
pub(crate) fn test_settings_with(overrides: &[(&str, &str)]) -> Settings {
    let mut vars: HashMap<String, String> = [
        ("FALOWEN_ENV", "test"),
        ("FALOWEN_STRICT_CONFIG", "0"),
        ("JWT_SECRET", TEST_JWT_SECRET),
        ("REDIS_HOST", "127.0.0.1"),
        ("PROMETHEUS_ENABLED", "0"),
    ]
    .into_iter()
    .map(|(key, value)| (key.to_string(), value.to_string()))
    .collect();

    for (key, value) in overrides {
        vars.insert((*key).to_string(), (*value).to_string());
    }

    Settings::load_from(&vars).expect("test settings")
}

pub(crate) fn test_settings() -> Settings {
    test_settings_with(&[])
}

/// Application state over an in-memory store and a never-connected Redis
/// handle (rate limits always allow).
pub(crate) fn test_state_with(settings: Settings) -> AppState {
    let redis = RedisHandle::new(settings.redis().redis_url());
    AppState::new(settings, Arc::new(MemoryDocumentStore::new()), redis).expect("test state")
}

pub(crate) fn test_app() -> (AppState, Router) {
    let state = test_state_with(test_settings());
    let app = api::router::router(state.clone());
    (state, app)
}

pub(crate) fn bearer_token(student_code: &str, settings: &Settings) -> String {
    security::create_access_token(student_code, settings, None).expect("token")
}

pub(crate) fn json_request(
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<serde_json::Value>,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);

    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }

    if let Some(body) = body {
        let bytes = serde_json::to_vec(&body).expect("serialize body");
        builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(bytes))
            .expect("request body")
    } else {
        builder.body(Body::empty()).expect("request body")
    }
}

pub(crate) async fn read_json(response: axum::response::Response<Body>) -> serde_json::Value {
    let body = to_bytes(response.into_body(), usize::MAX).await.expect("response body");
    serde_json::from_slice(&body).unwrap_or_else(|err| {
        let body_text = String::from_utf8_lossy(&body);
        panic!("json parse: {err}; body: {body_text}");
    })
}
