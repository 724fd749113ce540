use serde::{Deserialize, Serialize};
use serde_json::Value;
use validator::Validate;

use crate::services::session_state::{SessionState, TopicCoachKeys};

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct SaveTopicCoachRequest {
    #[validate(length(max = 500, message = "too many messages"))]
    pub(crate) messages: Vec<Value>,
    #[serde(default)]
    pub(crate) qcount: u64,
    #[serde(default)]
    pub(crate) finalized: bool,
}

#[derive(Debug, Serialize)]
pub(crate) struct TopicCoachResponse {
    pub(crate) keys: TopicCoachKeys,
    pub(crate) state: SessionState,
}

#[derive(Debug, Serialize)]
pub(crate) struct SaveTopicCoachResponse {
    pub(crate) saved: bool,
}
