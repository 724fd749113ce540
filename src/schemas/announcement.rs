use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::db::Document;

#[derive(Debug, Default, Deserialize)]
pub(crate) struct AnnouncementQuery {
    pub(crate) level: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct CreateAnnouncementRequest {
    #[validate(length(min = 1, max = 200, message = "title must be 1-200 characters"))]
    pub(crate) title: String,
    #[serde(default)]
    #[validate(length(max = 10000, message = "body is too long"))]
    pub(crate) body: String,
    #[validate(length(min = 2, max = 8, message = "level must look like A1"))]
    pub(crate) level: Option<String>,
    #[serde(default)]
    pub(crate) pinned: bool,
}

#[derive(Debug, Serialize)]
pub(crate) struct AnnouncementResponse {
    pub(crate) id: String,
    pub(crate) title: String,
    pub(crate) body: String,
    pub(crate) level: Option<String>,
    pub(crate) pinned: bool,
    pub(crate) created_at: Option<String>,
}

impl AnnouncementResponse {
    pub(crate) fn from_document(doc: &Document) -> Self {
        Self {
            id: doc.id.clone(),
            title: doc.text_field("title").unwrap_or_default(),
            body: doc.text_field("body").unwrap_or_default(),
            level: doc.text_field("level"),
            pinned: doc.bool_field("pinned"),
            created_at: doc.text_field("created_at"),
        }
    }
}
