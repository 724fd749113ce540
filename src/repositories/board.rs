use serde_json::json;

use crate::core::time::now_rfc3339;
use crate::db::{fields, CollectionPath, Document, DocumentStore, StoreError};

pub(crate) fn posts(level: &str, class_name: &str) -> CollectionPath {
    CollectionPath::root("class_board")
        .doc(level.trim())
        .collection("classes")
        .doc(class_name)
        .collection("posts")
}

fn comments(level: &str, class_name: &str, post_id: &str) -> CollectionPath {
    posts(level, class_name).doc(post_id).collection("comments")
}

pub(crate) struct CreatePost<'a> {
    pub(crate) student_code: &'a str,
    pub(crate) student_name: &'a str,
    pub(crate) content: &'a str,
    pub(crate) topic: Option<&'a str>,
    pub(crate) chapter: Option<&'a str>,
}

pub(crate) struct CreateComment<'a> {
    pub(crate) student_code: &'a str,
    pub(crate) student_name: &'a str,
    pub(crate) content: &'a str,
}

pub(crate) async fn create_post(
    store: &dyn DocumentStore,
    level: &str,
    class_name: &str,
    new: CreatePost<'_>,
) -> Result<Document, StoreError> {
    let body = fields(json!({
        "student_code": new.student_code.trim(),
        "student_name": new.student_name.trim(),
        "content": new.content.trim(),
        "topic": new.topic.map(str::trim).unwrap_or_default(),
        "chapter": new.chapter.map(str::trim).unwrap_or_default(),
        "created_at": now_rfc3339(),
    }));
    let id = store.add(&posts(level, class_name), body.clone()).await?;
    Ok(Document { id, fields: body })
}

fn matches_topic(doc: &Document, topic: &str) -> bool {
    let wanted = topic.trim();
    ["topic", "chapter"].iter().any(|key| {
        doc.text_field(key).is_some_and(|value| value.eq_ignore_ascii_case(wanted))
    })
}

/// Posts of one class, newest first, optionally narrowed to a topic or chapter.
pub(crate) async fn list_posts(
    store: &dyn DocumentStore,
    level: &str,
    class_name: &str,
    topic: Option<&str>,
) -> Result<Vec<Document>, StoreError> {
    let mut docs = store.stream(&posts(level, class_name)).await?;
    if let Some(topic) = topic.filter(|topic| !topic.trim().is_empty()) {
        docs.retain(|doc| matches_topic(doc, topic));
    }
    docs.reverse();
    Ok(docs)
}

/// `None` when the post does not exist.
pub(crate) async fn add_comment(
    store: &dyn DocumentStore,
    level: &str,
    class_name: &str,
    post_id: &str,
    new: CreateComment<'_>,
) -> Result<Option<Document>, StoreError> {
    if store.get(&posts(level, class_name).doc(post_id)).await?.is_none() {
        return Ok(None);
    }

    let body = fields(json!({
        "student_code": new.student_code.trim(),
        "student_name": new.student_name.trim(),
        "content": new.content.trim(),
        "created_at": now_rfc3339(),
    }));
    let id = store.add(&comments(level, class_name, post_id), body.clone()).await?;
    Ok(Some(Document { id, fields: body }))
}

pub(crate) async fn list_comments(
    store: &dyn DocumentStore,
    level: &str,
    class_name: &str,
    post_id: &str,
) -> Result<Option<Vec<Document>>, StoreError> {
    if store.get(&posts(level, class_name).doc(post_id)).await?.is_none() {
        return Ok(None);
    }
    Ok(Some(store.stream(&comments(level, class_name, post_id)).await?))
}
