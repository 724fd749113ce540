use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;
use serde_json::Value;

use crate::db::Fields;

const SCORE_KEYS: &[&str] = &["numeric_score", "score", "percentage", "percent", "points", "marks"];

fn number_token() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"-?\d+(?:\.\d+)?").expect("valid score regex"))
}

/// Numeric view of a stored score: numbers as-is, strings such as `"85%"`
/// or `"score: 72.5"` through their first number.
pub(crate) fn coerce_score_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64().filter(|score| score.is_finite()),
        Value::String(text) => {
            let stripped = text.replace('%', "");
            number_token()
                .find(stripped.trim())
                .and_then(|token| token.as_str().parse::<f64>().ok())
        }
        _ => None,
    }
}

pub(crate) fn numeric_score(fields: &Fields) -> Option<f64> {
    SCORE_KEYS
        .iter()
        .filter_map(|key| fields.get(*key))
        .find_map(coerce_score_value)
}

/// Grading outcome read from a score record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ScoreState {
    Completed,
    Resubmit,
}

/// Tutors sometimes record an outcome in words instead of a number.
/// Negated phrases such as "no resubmission needed" count as completed.
pub(crate) fn infer_textual_score_state(text: &str) -> Option<ScoreState> {
    let text = text.trim().to_lowercase();
    if text.is_empty() {
        return None;
    }
    if ["no resubmi", "not required", "not needed"].iter().any(|phrase| text.contains(phrase)) {
        return Some(ScoreState::Completed);
    }
    if text.contains("resubmi") || text.contains("fail") {
        return Some(ScoreState::Resubmit);
    }
    if text.contains("pass") || text.contains("complet") {
        return Some(ScoreState::Completed);
    }
    None
}

/// Numeric score against `pass_mark` first, then the wording of the
/// `score` and `status` fields.
pub(crate) fn score_state(fields: &Fields, pass_mark: f64) -> Option<ScoreState> {
    if let Some(score) = numeric_score(fields) {
        return Some(if score >= pass_mark { ScoreState::Completed } else { ScoreState::Resubmit });
    }
    ["score", "status"]
        .iter()
        .filter_map(|key| fields.get(*key).and_then(Value::as_str))
        .find_map(infer_textual_score_state)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct SubmitStatus {
    pub(crate) status_label: &'static str,
    pub(crate) locked: bool,
    pub(crate) needs_resubmit: bool,
    pub(crate) from_scores: bool,
    pub(crate) clear_lock: bool,
}

/// Lesson status shown to the student.
///
/// A graded score decides on its own. Without one, a submission is
/// "In review" unless it was stored flagged for resubmission.
pub(crate) fn derive_submit_status(
    locked: bool,
    needs_resubmit: Option<bool>,
    latest_submission: Option<&Fields>,
    latest_score: Option<&Fields>,
    pass_mark: f64,
) -> SubmitStatus {
    match latest_score.and_then(|score| score_state(score, pass_mark)) {
        Some(ScoreState::Completed) => {
            return SubmitStatus {
                status_label: "Completed",
                locked: true,
                needs_resubmit: false,
                from_scores: true,
                clear_lock: false,
            };
        }
        Some(ScoreState::Resubmit) => {
            return SubmitStatus {
                status_label: "Resubmission needed",
                locked: false,
                needs_resubmit: true,
                from_scores: true,
                clear_lock: true,
            };
        }
        None => {}
    }

    if latest_submission.is_some() {
        let soft_resubmit = needs_resubmit.unwrap_or(false);
        return SubmitStatus {
            status_label: if soft_resubmit { "Resubmission needed" } else { "In review" },
            locked: !soft_resubmit,
            needs_resubmit: soft_resubmit,
            from_scores: false,
            clear_lock: soft_resubmit,
        };
    }

    SubmitStatus {
        status_label: "Not yet submitted",
        locked,
        needs_resubmit: needs_resubmit.unwrap_or(false),
        from_scores: false,
        clear_lock: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::fields;
    use serde_json::json;

    #[test]
    fn coerces_numbers_and_decorated_strings() {
        assert_eq!(coerce_score_value(&json!(85)), Some(85.0));
        assert_eq!(coerce_score_value(&json!("85%")), Some(85.0));
        assert_eq!(coerce_score_value(&json!(" Score: 72.5 / 100")), Some(72.5));
        assert_eq!(coerce_score_value(&json!("-3")), Some(-3.0));
        assert_eq!(coerce_score_value(&json!("pending")), None);
        assert_eq!(coerce_score_value(&json!(null)), None);
        assert_eq!(coerce_score_value(&json!(true)), None);
    }

    #[test]
    fn numeric_score_prefers_earlier_keys() {
        let doc = fields(json!({"marks": 10, "score": "55%", "numeric_score": "n/a"}));
        assert_eq!(numeric_score(&doc), Some(55.0));
        assert_eq!(numeric_score(&fields(json!({"comment": "ok"}))), None);
    }

    #[test]
    fn submission_without_score_is_in_review() {
        let submission = fields(json!({"answer": "Hallo"}));
        let status = derive_submit_status(true, None, Some(&submission), None, 60.0);

        assert_eq!(status.status_label, "In review");
        assert!(status.locked);
        assert!(!status.needs_resubmit);
        assert!(!status.from_scores);
        assert!(!status.clear_lock);
    }

    #[test]
    fn passing_score_completes_the_lesson() {
        let submission = fields(json!({"answer": "Hallo"}));
        let score = fields(json!({"score": 85}));
        let status = derive_submit_status(true, Some(true), Some(&submission), Some(&score), 60.0);

        assert_eq!(status.status_label, "Completed");
        assert!(status.locked);
        assert!(!status.needs_resubmit);
        assert!(!status.clear_lock);
    }

    #[test]
    fn failing_score_reopens_the_lesson() {
        let submission = fields(json!({"answer": "Hallo"}));
        let score = fields(json!({"score": 40}));
        let status = derive_submit_status(true, None, Some(&submission), Some(&score), 60.0);

        assert_eq!(status.status_label, "Resubmission needed");
        assert!(!status.locked);
        assert!(status.needs_resubmit);
        assert!(status.clear_lock);
    }

    #[test]
    fn nothing_submitted_keeps_caller_state() {
        let status = derive_submit_status(false, None, None, None, 60.0);
        assert_eq!(status.status_label, "Not yet submitted");
        assert!(!status.locked);
        assert!(!status.needs_resubmit);
        assert!(!status.from_scores);

        let unscored = fields(json!({"score": "pending"}));
        let status = derive_submit_status(true, Some(true), None, Some(&unscored), 60.0);
        assert_eq!(status.status_label, "Not yet submitted");
        assert!(status.locked);
        assert!(status.needs_resubmit);
    }

    #[test]
    fn textual_outcomes_are_recognised() {
        for text in ["Resubmission needed", "resubmit please", "Failed"] {
            assert_eq!(infer_textual_score_state(text), Some(ScoreState::Resubmit), "{text}");
        }
        for text in [
            "Pass",
            "Completed",
            "Completed - no resubmission needed",
            "Completed - resubmission not required",
        ] {
            assert_eq!(infer_textual_score_state(text), Some(ScoreState::Completed), "{text}");
        }
        assert_eq!(infer_textual_score_state("pending"), None);
        assert_eq!(infer_textual_score_state("  "), None);
    }

    #[test]
    fn textual_score_or_status_decides_the_label() {
        let submission = fields(json!({"answer": "Hallo"}));
        let cases = [
            (json!({"score": "Resubmission needed"}), "Resubmission needed", true),
            (json!({"status": "Resubmission needed"}), "Resubmission needed", true),
            (json!({"score": "Pass"}), "Completed", false),
            (json!({"status": "Completed"}), "Completed", false),
            (json!({"score": "Completed - no resubmission needed"}), "Completed", false),
            (json!({"status": "Completed - resubmission not required"}), "Completed", false),
        ];

        for (score, label, needs) in cases {
            let score = fields(score);
            let status = derive_submit_status(true, None, Some(&submission), Some(&score), 60.0);
            assert_eq!(status.status_label, label);
            assert_eq!(status.needs_resubmit, needs);
            assert_eq!(status.clear_lock, needs);
            assert!(status.from_scores);
        }
    }

    #[test]
    fn soft_resubmit_flag_shows_until_graded() {
        let submission = fields(json!({"answer": "kurz", "needs_resubmit": true}));
        let status = derive_submit_status(false, Some(true), Some(&submission), None, 60.0);
        assert_eq!(status.status_label, "Resubmission needed");
        assert!(status.needs_resubmit);
        assert!(!status.locked);

        let completed = fields(json!({"status": "Completed"}));
        let status =
            derive_submit_status(false, Some(true), Some(&submission), Some(&completed), 60.0);
        assert_eq!(status.status_label, "Completed");
        assert!(!status.needs_resubmit);
        assert!(status.locked);
    }
}
