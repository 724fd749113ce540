use serde::Serialize;
use thiserror::Error;

use crate::core::config::CourseworkSettings;
use crate::core::metrics;
use crate::db::{Document, DocumentStore, StoreError};
use crate::repositories::{scores, submissions};
use crate::services::lesson_keys::lesson_key_build;
use crate::services::resubmit::{
    compute_resubmit_unlock_state, should_abort_submission_for_existing_attempt, Lesson,
    ResubmitState, ResubmitSummary,
};

#[derive(Debug, Error)]
pub(crate) enum SubmissionError {
    #[error("submission already in progress")]
    InProgress,
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum SubmitOutcome {
    Submitted,
    Resubmitted,
    AlreadySubmitted,
}

impl SubmitOutcome {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            SubmitOutcome::Submitted => "submitted",
            SubmitOutcome::Resubmitted => "resubmitted",
            SubmitOutcome::AlreadySubmitted => "already_submitted",
        }
    }
}

pub(crate) struct SubmitRequest<'a> {
    pub(crate) level: &'a str,
    pub(crate) day: u32,
    pub(crate) chapter: &'a str,
    pub(crate) student_code: &'a str,
    pub(crate) student_name: &'a str,
    pub(crate) answer: &'a str,
    pub(crate) lesson: &'a Lesson,
}

#[derive(Debug)]
pub(crate) struct SubmitResult {
    pub(crate) outcome: SubmitOutcome,
    pub(crate) lesson_key: String,
    pub(crate) state: ResubmitState,
    pub(crate) submission: Document,
}

/// Records a coursebook answer once per student and lesson, reopening the
/// lesson when the resubmit rules say so.
pub(crate) struct SubmissionFlow<'a> {
    store: &'a dyn DocumentStore,
    pass_mark: f64,
    min_words: usize,
}

impl<'a> SubmissionFlow<'a> {
    pub(crate) fn new(store: &'a dyn DocumentStore, coursework: &CourseworkSettings) -> Self {
        Self { store, pass_mark: coursework.pass_mark, min_words: coursework.min_resubmit_words }
    }

    pub(crate) async fn submit(
        &self,
        request: SubmitRequest<'_>,
    ) -> Result<SubmitResult, SubmissionError> {
        let level = request.level.trim();
        let lesson_key = lesson_key_build(level, request.day, request.chapter);

        let failed =
            scores::failed_identifiers(self.store, request.student_code, self.pass_mark).await?;
        let summary = ResubmitSummary { failed_identifiers: failed };

        let prior_locked =
            submissions::is_locked(self.store, level, request.student_code, &lesson_key).await?;
        let state = compute_resubmit_unlock_state(
            prior_locked,
            &summary,
            request.lesson,
            request.answer,
            self.min_words,
        );

        let got_lock =
            submissions::acquire_lock(self.store, level, request.student_code, &lesson_key).await?;
        let existing = if got_lock {
            false
        } else {
            submissions::has_existing_submission(self.store, level, request.student_code, &lesson_key)
                .await?
        };
        let guard =
            should_abort_submission_for_existing_attempt(state.needs_resubmit, got_lock, || existing);

        if guard.abort {
            tracing::warn!(
                level = %level,
                lesson_key = %lesson_key,
                "Submission rejected: another attempt holds the lock"
            );
            metrics::record_submission("conflict", level);
            return Err(SubmissionError::InProgress);
        }

        if guard.recovered && !state.needs_resubmit {
            let latest =
                submissions::fetch_latest(self.store, level, request.student_code, &lesson_key)
                    .await?;
            if let Some(submission) = latest {
                return Ok(self.finish(SubmitOutcome::AlreadySubmitted, lesson_key, state, submission));
            }
        }

        let created = submissions::create(
            self.store,
            submissions::CreateSubmission {
                level,
                student_code: request.student_code,
                student_name: request.student_name,
                lesson_key: &lesson_key,
                chapter: request.chapter,
                answer: request.answer,
                needs_resubmit: state.needs_resubmit,
                resubmission: guard.recovered,
            },
        )
        .await;

        let submission = match created {
            Ok(submission) => submission,
            Err(err) => {
                if got_lock {
                    let released =
                        submissions::release_lock(self.store, level, request.student_code, &lesson_key)
                            .await;
                    if let Err(release_err) = released {
                        tracing::warn!(error = %release_err, "Failed to release submission lock");
                    }
                }
                metrics::record_submission("error", level);
                return Err(err.into());
            }
        };

        // A lesson that needs a resubmission stays open.
        if state.needs_resubmit {
            let released =
                submissions::release_lock(self.store, level, request.student_code, &lesson_key).await;
            if let Err(err) = released {
                tracing::warn!(error = %err, lesson_key = %lesson_key, "Failed to reopen lesson lock");
            }
        }
        let state = ResubmitState { locked_after: !state.needs_resubmit, ..state };

        let outcome =
            if guard.recovered { SubmitOutcome::Resubmitted } else { SubmitOutcome::Submitted };
        Ok(self.finish(outcome, lesson_key, state, submission))
    }

    fn finish(
        &self,
        outcome: SubmitOutcome,
        lesson_key: String,
        state: ResubmitState,
        submission: Document,
    ) -> SubmitResult {
        let level = submission.str_field("level").unwrap_or_default().to_string();
        tracing::info!(
            outcome = outcome.as_str(),
            level = %level,
            lesson_key = %lesson_key,
            submission_id = %submission.id,
            needs_resubmit = state.needs_resubmit,
            locked_after = state.locked_after,
            "Coursebook submission handled"
        );
        metrics::record_submission(outcome.as_str(), &level);
        SubmitResult { outcome, lesson_key, state, submission }
    }
}
