use std::cmp::Reverse;

use serde_json::json;

use crate::core::time::{now_rfc3339, parse_rfc3339};
use crate::db::{fields, CollectionPath, Document, DocumentStore, StoreError};

pub(crate) fn collection() -> CollectionPath {
    CollectionPath::root("announcements")
}

pub(crate) struct CreateAnnouncement<'a> {
    pub(crate) title: &'a str,
    pub(crate) body: &'a str,
    pub(crate) level: Option<&'a str>,
    pub(crate) pinned: bool,
}

pub(crate) async fn create(
    store: &dyn DocumentStore,
    new: CreateAnnouncement<'_>,
) -> Result<Document, StoreError> {
    let body = fields(json!({
        "title": new.title.trim(),
        "body": new.body.trim(),
        "level": new.level.map(|level| level.trim().to_uppercase()),
        "pinned": new.pinned,
        "created_at": now_rfc3339(),
    }));
    let id = store.add(&collection(), body.clone()).await?;
    Ok(Document { id, fields: body })
}

/// Pinned first, then newest first. Announcements without a level are shown
/// to every level.
pub(crate) async fn list(
    store: &dyn DocumentStore,
    level: Option<&str>,
) -> Result<Vec<Document>, StoreError> {
    let mut docs = store.stream(&collection()).await?;
    if let Some(level) = level.map(str::trim).filter(|level| !level.is_empty()) {
        docs.retain(|doc| {
            doc.text_field("level").map_or(true, |stored| stored.eq_ignore_ascii_case(level))
        });
    }
    docs.reverse();
    docs.sort_by_key(|doc| {
        (
            Reverse(doc.bool_field("pinned")),
            Reverse(doc.str_field("created_at").and_then(parse_rfc3339)),
        )
    });
    Ok(docs)
}
