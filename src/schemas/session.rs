use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::repositories::sessions::SessionRecord;

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct CreateSessionRequest {
    #[serde(default)]
    #[validate(length(max = 128, message = "name is too long"))]
    pub(crate) name: String,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct SessionTokenRequest {
    #[validate(length(min = 1, max = 128, message = "token must not be empty"))]
    pub(crate) token: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct SessionTokenResponse {
    pub(crate) token: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct SessionResponse {
    pub(crate) valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) session: Option<SessionRecord>,
}
