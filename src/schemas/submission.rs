use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::services::resubmit::{Lesson, ResubmitState};
use crate::services::submission_flow::SubmitOutcome;
use crate::services::submit_status::SubmitStatus;

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct SubmitAnswerRequest {
    #[validate(length(min = 2, max = 8, message = "level must look like A1"))]
    pub(crate) level: String,
    #[validate(range(min = 1, max = 400, message = "day must be between 1 and 400"))]
    pub(crate) day: u32,
    #[validate(length(min = 1, max = 64, message = "chapter must not be empty"))]
    pub(crate) chapter: String,
    #[serde(default)]
    #[validate(length(max = 128, message = "student_name is too long"))]
    pub(crate) student_name: String,
    #[validate(length(max = 20000, message = "answer is too long"))]
    pub(crate) answer: String,
    #[serde(default)]
    pub(crate) lesson: Lesson,
}

#[derive(Debug, Serialize)]
pub(crate) struct SubmitAnswerResponse {
    pub(crate) outcome: SubmitOutcome,
    pub(crate) submission_id: String,
    pub(crate) lesson_key: String,
    pub(crate) submitted_on: Option<String>,
    #[serde(flatten)]
    pub(crate) state: ResubmitState,
}

#[derive(Debug, Serialize)]
pub(crate) struct SubmitStatusResponse {
    pub(crate) lesson_key: String,
    #[serde(flatten)]
    pub(crate) status: SubmitStatus,
    pub(crate) latest_submission_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct StreakQuery {
    pub(crate) level: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct StreakResponse {
    pub(crate) student_code: String,
    pub(crate) streak_days: u32,
    pub(crate) last_submitted_on: Option<String>,
}
