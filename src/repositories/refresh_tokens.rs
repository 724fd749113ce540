use serde_json::json;

use crate::core::security::token_digest;
use crate::core::time::now_rfc3339;
use crate::db::{fields, CollectionPath, DocPath, DocumentStore, StoreError};

fn record(user_id: &str) -> DocPath {
    CollectionPath::root("refresh_tokens").doc(user_id)
}

/// Remember the only refresh token currently valid for `user_id`.
pub(crate) async fn store_token(
    store: &dyn DocumentStore,
    user_id: &str,
    token: &str,
) -> Result<(), StoreError> {
    let body = fields(json!({
        "token_hash": token_digest(token),
        "updated_at": now_rfc3339(),
    }));
    store.set(&record(user_id), body).await
}

pub(crate) async fn matches(
    store: &dyn DocumentStore,
    user_id: &str,
    token: &str,
) -> Result<bool, StoreError> {
    let stored = store.get(&record(user_id)).await?;
    Ok(stored.is_some_and(|doc| doc.str_field("token_hash") == Some(token_digest(token).as_str())))
}

pub(crate) async fn revoke(store: &dyn DocumentStore, user_id: &str) -> Result<(), StoreError> {
    store.delete(&record(user_id)).await
}
