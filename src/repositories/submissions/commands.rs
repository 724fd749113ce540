use serde_json::json;

use crate::core::time::{now_rfc3339, now_utc};
use crate::db::{fields, Document, DocumentStore, StoreError};

use super::{lock_path, posts};

pub(crate) struct CreateSubmission<'a> {
    pub(crate) level: &'a str,
    pub(crate) student_code: &'a str,
    pub(crate) student_name: &'a str,
    pub(crate) lesson_key: &'a str,
    pub(crate) chapter: &'a str,
    pub(crate) answer: &'a str,
    pub(crate) needs_resubmit: bool,
    pub(crate) resubmission: bool,
}

pub(crate) async fn create(
    store: &dyn DocumentStore,
    new: CreateSubmission<'_>,
) -> Result<Document, StoreError> {
    let now = now_rfc3339();
    let body = fields(json!({
        "student_code": new.student_code.trim(),
        "student_name": new.student_name.trim(),
        "level": new.level.trim(),
        "lesson_key": new.lesson_key,
        "chapter": new.chapter.trim(),
        "answer": new.answer,
        "submitted_on": now_utc().date().to_string(),
        "needs_resubmit": new.needs_resubmit,
        "resubmission": new.resubmission,
        "created_at": now,
        "updated_at": now,
    }));

    let id = store.add(&posts(new.level), body.clone()).await?;
    Ok(Document { id, fields: body })
}

/// Create-if-absent on the lock document. `true` means this caller owns it.
pub(crate) async fn acquire_lock(
    store: &dyn DocumentStore,
    level: &str,
    student_code: &str,
    lesson_key: &str,
) -> Result<bool, StoreError> {
    let body = fields(json!({
        "level": level.trim(),
        "student_code": student_code.trim(),
        "lesson_key": lesson_key,
        "created_at": now_rfc3339(),
    }));
    store.create(&lock_path(level, student_code, lesson_key), body).await
}

pub(crate) async fn release_lock(
    store: &dyn DocumentStore,
    level: &str,
    student_code: &str,
    lesson_key: &str,
) -> Result<(), StoreError> {
    store.delete(&lock_path(level, student_code, lesson_key)).await
}
