//! Resubmission eligibility for coursebook assignments.
//!
//! Everything here is pure: callers pass the student's failed assignment
//! numbers, the lesson metadata and the submitted text, and get plain values
//! back. Persistence and locking happen in `services::submission_flow`.

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};

pub(crate) const MIN_RESUBMIT_WORD_COUNT: usize = 20;

fn assignment_number_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\d+(?:\.\d+)?").expect("valid assignment number regex"))
}

/// Chapter/assignment number such as `2` or `2.5`, totally ordered so it can
/// live in a `BTreeSet`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(transparent)]
pub(crate) struct AssignmentNumber(f64);

impl AssignmentNumber {
    pub(crate) fn new(value: f64) -> Option<Self> {
        value.is_finite().then_some(Self(value))
    }

    pub(crate) fn value(self) -> f64 {
        self.0
    }
}

impl PartialEq for AssignmentNumber {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for AssignmentNumber {}

impl PartialOrd for AssignmentNumber {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for AssignmentNumber {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

fn day_prefix_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?i)\bday\s*\d+\b").expect("valid day prefix regex"))
}

/// Every integer-or-decimal token in `text`. Non-numeric text yields nothing.
///
/// A short integer after a decimal continues its series, so `"12.1,2,3"`
/// reads as 12.1, 12.2 and 12.3. An integer longer than the last decimal
/// part stands on its own and ends the series.
pub(crate) fn numbers_in(text: &str) -> Vec<AssignmentNumber> {
    let mut numbers = Vec::new();
    let mut series: Option<(&str, usize)> = None;

    for token in assignment_number_pattern().find_iter(text).map(|token| token.as_str()) {
        let expanded = match token.split_once('.') {
            Some((whole, fraction)) => {
                series = Some((whole, fraction.len()));
                token.to_string()
            }
            None => {
                let digits = match token.trim_start_matches('0') {
                    "" => "0",
                    digits => digits,
                };
                match series {
                    Some((whole, width)) if width > 0 && digits.len() <= width => {
                        format!("{whole}.{digits:0>width$}")
                    }
                    _ => {
                        series = None;
                        token.to_string()
                    }
                }
            }
        };
        if let Some(number) = expanded.parse::<f64>().ok().and_then(AssignmentNumber::new) {
            numbers.push(number);
        }
    }

    numbers
}

/// Assignment numbers named by a score or summary label such as
/// `"Day 3 – 1.0"`. The day counter is not an assignment.
pub(crate) fn label_numbers(label: &str) -> Vec<AssignmentNumber> {
    numbers_in(&day_prefix_pattern().replace_all(label, " "))
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct SubAssignment {
    #[serde(default)]
    pub(crate) assignment: bool,
    #[serde(default, deserialize_with = "chapter_text")]
    pub(crate) chapter: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct Lesson {
    #[serde(default)]
    pub(crate) assignment: bool,
    #[serde(default, deserialize_with = "chapter_text")]
    pub(crate) chapter: Option<String>,
    #[serde(default)]
    pub(crate) schreiben_sprechen: Vec<SubAssignment>,
    #[serde(default)]
    pub(crate) lesen_hoeren: Vec<SubAssignment>,
    /// Older lesson exports spell the key with an umlaut; some carry both.
    #[serde(default, rename = "lesen_hören")]
    pub(crate) lesen_hoeren_umlaut: Vec<SubAssignment>,
}

impl Lesson {
    fn sub_assignments(&self) -> impl Iterator<Item = &SubAssignment> {
        self.schreiben_sprechen
            .iter()
            .chain(self.lesen_hoeren.iter())
            .chain(self.lesen_hoeren_umlaut.iter())
    }

    pub(crate) fn has_flagged_sub_assignment(&self) -> bool {
        self.sub_assignments().any(|sub| sub.assignment)
    }

    pub(crate) fn is_assignment(&self) -> bool {
        self.assignment || self.has_flagged_sub_assignment()
    }
}

/// Chapters arrive as strings (`"2.5"`, `"intro"`) or bare JSON numbers.
fn chapter_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(text)) => Some(text),
        Some(serde_json::Value::Number(number)) => Some(number.to_string()),
        _ => None,
    })
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct ResubmitSummary {
    #[serde(default)]
    pub(crate) failed_identifiers: BTreeSet<AssignmentNumber>,
}

impl ResubmitSummary {
    pub(crate) fn from_failed<I: IntoIterator<Item = f64>>(values: I) -> Self {
        Self { failed_identifiers: values.into_iter().filter_map(AssignmentNumber::new).collect() }
    }
}

/// Numbers of the lesson itself (when flagged) plus every flagged
/// sub-assignment one level down. A flagged sub-assignment without its own
/// chapter counts under the lesson's chapter.
pub(crate) fn extract_assignment_numbers(lesson: &Lesson) -> BTreeSet<AssignmentNumber> {
    let mut numbers = BTreeSet::new();

    if lesson.assignment {
        if let Some(chapter) = lesson.chapter.as_deref() {
            numbers.extend(numbers_in(chapter));
        }
    }

    for sub in lesson.sub_assignments().filter(|sub| sub.assignment) {
        if let Some(chapter) = sub.chapter.as_deref().or(lesson.chapter.as_deref()) {
            numbers.extend(numbers_in(chapter));
        }
    }

    numbers
}

pub(crate) fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

pub(crate) fn determine_needs_resubmit(
    summary: &ResubmitSummary,
    lesson: &Lesson,
    answer_text: &str,
    min_words: usize,
) -> bool {
    if !lesson.is_assignment() {
        return false;
    }

    let numbers = extract_assignment_numbers(lesson);
    if !numbers.is_disjoint(&summary.failed_identifiers) {
        return true;
    }

    word_count(answer_text) < min_words
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub(crate) struct ResubmitState {
    pub(crate) needs_resubmit: bool,
    pub(crate) locked_after: bool,
}

pub(crate) fn compute_resubmit_unlock_state(
    prior_locked: bool,
    summary: &ResubmitSummary,
    lesson: &Lesson,
    answer_text: &str,
    min_words: usize,
) -> ResubmitState {
    let needs_resubmit = determine_needs_resubmit(summary, lesson, answer_text, min_words);
    ResubmitState { needs_resubmit, locked_after: prior_locked && !needs_resubmit }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub(crate) struct SubmissionGuard {
    pub(crate) abort: bool,
    pub(crate) recovered: bool,
}

/// Decide what to do when a new attempt races an earlier one.
///
/// `has_existing_submission` is only consulted when the lock was not acquired.
pub(crate) fn should_abort_submission_for_existing_attempt<F>(
    needs_resubmit: bool,
    got_lock: bool,
    has_existing_submission: F,
) -> SubmissionGuard
where
    F: FnOnce() -> bool,
{
    if got_lock {
        return SubmissionGuard { abort: false, recovered: false };
    }

    if has_existing_submission() {
        tracing::debug!(needs_resubmit, "lock held by an earlier recorded attempt; recovering");
        return SubmissionGuard { abort: false, recovered: true };
    }

    SubmissionGuard { abort: true, recovered: false }
}
