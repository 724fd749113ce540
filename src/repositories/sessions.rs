use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use rand::RngCore;
use serde::Serialize;
use serde_json::json;

use crate::core::config::SessionSettings;
use crate::core::time::now_utc;
use crate::db::{fields, CollectionPath, DocPath, Document, DocumentStore, StoreError};

const TOKEN_BYTES: usize = 48;

fn session(token: &str) -> DocPath {
    CollectionPath::root("sessions").doc(token)
}

fn random_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct SessionRecord {
    pub(crate) student_code: String,
    pub(crate) name: String,
    pub(crate) issued_at: i64,
    pub(crate) expires_at: i64,
}

impl SessionRecord {
    fn from_document(doc: &Document) -> Self {
        let seconds = |key: &str| doc.f64_field(key).map(|value| value as i64).unwrap_or(0);
        Self {
            student_code: doc.text_field("student_code").unwrap_or_default(),
            name: doc.text_field("name").unwrap_or_default(),
            issued_at: seconds("issued_at"),
            expires_at: seconds("expires_at"),
        }
    }
}

fn ttl_seconds(settings: &SessionSettings) -> i64 {
    i64::try_from(settings.ttl_minutes.saturating_mul(60)).unwrap_or(i64::MAX)
}

pub(crate) async fn create_session_token(
    store: &dyn DocumentStore,
    settings: &SessionSettings,
    student_code: &str,
    name: &str,
    ua_hash: &str,
) -> Result<String, StoreError> {
    let now = now_utc().unix_timestamp();
    let token = random_token();
    let body = fields(json!({
        "student_code": student_code.trim().to_lowercase(),
        "name": name,
        "issued_at": now,
        "expires_at": now.saturating_add(ttl_seconds(settings)),
        "ua_hash": ua_hash,
    }));
    store.set(&session(&token), body).await?;
    Ok(token)
}

/// Expired, unknown, or user-agent mismatched tokens yield `None`.
pub(crate) async fn validate_session_token(
    store: &dyn DocumentStore,
    token: &str,
    ua_hash: &str,
) -> Result<Option<SessionRecord>, StoreError> {
    if token.trim().is_empty() {
        return Ok(None);
    }
    let Some(doc) = store.get(&session(token)).await? else {
        return Ok(None);
    };

    let record = SessionRecord::from_document(&doc);
    if record.expires_at < now_utc().unix_timestamp() {
        return Ok(None);
    }

    let stored_ua = doc.str_field("ua_hash").unwrap_or_default();
    if !stored_ua.is_empty() && !ua_hash.is_empty() && stored_ua != ua_hash {
        return Ok(None);
    }

    Ok(Some(record))
}

/// Extend the session and swap in a fresh token once it is old enough.
/// Returns the token the client should keep using.
pub(crate) async fn refresh_or_rotate_session_token(
    store: &dyn DocumentStore,
    settings: &SessionSettings,
    token: &str,
) -> Result<String, StoreError> {
    let path = session(token);
    let Some(doc) = store.get(&path).await? else {
        return Ok(token.to_string());
    };

    let now = now_utc().unix_timestamp();
    let expires_at = now.saturating_add(ttl_seconds(settings));
    let issued_at = doc.f64_field("issued_at").map(|value| value as i64).unwrap_or(now);
    let rotate_after =
        i64::try_from(settings.rotate_after_minutes.saturating_mul(60)).unwrap_or(i64::MAX);

    if now.saturating_sub(issued_at) <= rotate_after {
        store.merge(&path, fields(json!({"expires_at": expires_at}))).await?;
        return Ok(token.to_string());
    }

    let fresh = random_token();
    let mut body = doc.fields;
    body.insert("issued_at".into(), json!(now));
    body.insert("expires_at".into(), json!(expires_at));
    store.set(&session(&fresh), body).await?;

    if let Err(err) = store.delete(&path).await {
        tracing::warn!(error = %err, "Failed to delete rotated session token");
    }
    tracing::debug!("Session token rotated");
    Ok(fresh)
}

pub(crate) async fn destroy_session_token(
    store: &dyn DocumentStore,
    token: &str,
) -> Result<(), StoreError> {
    store.delete(&session(token)).await
}
