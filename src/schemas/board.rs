use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::db::Document;

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct CreatePostRequest {
    #[serde(default)]
    #[validate(length(max = 128, message = "student_name is too long"))]
    pub(crate) student_name: String,
    #[validate(length(min = 1, max = 5000, message = "content must be 1-5000 characters"))]
    pub(crate) content: String,
    #[validate(length(max = 128, message = "topic is too long"))]
    pub(crate) topic: Option<String>,
    #[validate(length(max = 32, message = "chapter is too long"))]
    pub(crate) chapter: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct CreateCommentRequest {
    #[serde(default)]
    #[validate(length(max = 128, message = "student_name is too long"))]
    pub(crate) student_name: String,
    #[validate(length(min = 1, max = 2000, message = "content must be 1-2000 characters"))]
    pub(crate) content: String,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct PostListQuery {
    pub(crate) topic: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct BoardEntry {
    pub(crate) id: String,
    pub(crate) student_code: String,
    pub(crate) student_name: String,
    pub(crate) content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) topic: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) chapter: Option<String>,
    pub(crate) created_at: Option<String>,
}

impl BoardEntry {
    pub(crate) fn from_document(doc: &Document) -> Self {
        Self {
            id: doc.id.clone(),
            student_code: doc.text_field("student_code").unwrap_or_default(),
            student_name: doc.text_field("student_name").unwrap_or_default(),
            content: doc.text_field("content").unwrap_or_default(),
            topic: doc.text_field("topic"),
            chapter: doc.text_field("chapter"),
            created_at: doc.text_field("created_at"),
        }
    }
}
