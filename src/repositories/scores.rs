use std::collections::{BTreeMap, BTreeSet};

use time::OffsetDateTime;

use crate::core::time::parse_rfc3339;
use crate::db::{CollectionPath, Document, DocumentStore, StoreError};
use crate::services::leaderboard::ScoreRow;
use crate::services::resubmit::{label_numbers, AssignmentNumber};
use crate::services::submit_status::{numeric_score, score_state, ScoreState};

const STUDENT_KEYS: &[&str] = &["student_code", "studentcode", "studentCode"];
const TIMESTAMP_KEYS: &[&str] = &["updated_at", "graded_at", "created_at"];

pub(crate) fn collection() -> CollectionPath {
    CollectionPath::root("scores")
}

fn student_code(doc: &Document) -> Option<String> {
    STUDENT_KEYS.iter().find_map(|key| doc.text_field(key))
}

fn belongs_to(doc: &Document, code: &str) -> bool {
    student_code(doc).is_some_and(|stored| stored.eq_ignore_ascii_case(code.trim()))
}

fn timestamp(doc: &Document) -> Option<OffsetDateTime> {
    TIMESTAMP_KEYS
        .iter()
        .filter_map(|key| doc.str_field(key))
        .find_map(parse_rfc3339)
}

/// Text naming the graded assignment, e.g. `"2.5"` or `"Chapter 3"`.
fn assignment_label(doc: &Document) -> Option<String> {
    doc.text_field("assignment").or_else(|| doc.text_field("chapter"))
}

pub(crate) async fn list_for_student(
    store: &dyn DocumentStore,
    student_code: &str,
) -> Result<Vec<Document>, StoreError> {
    let docs = store.stream(&collection()).await?;
    Ok(docs.into_iter().filter(|doc| belongs_to(doc, student_code)).collect())
}

/// Newest score for a lesson, matched by submission id or lesson key.
pub(crate) async fn fetch_latest_score(
    store: &dyn DocumentStore,
    student_code: &str,
    lesson_key: &str,
    submission_id: Option<&str>,
) -> Result<Option<Document>, StoreError> {
    let docs = list_for_student(store, student_code).await?;
    Ok(docs
        .into_iter()
        .filter(|doc| {
            doc.str_field("lesson_key") == Some(lesson_key)
                || submission_id.is_some_and(|id| doc.str_field("submission_id") == Some(id))
        })
        .max_by_key(timestamp))
}

/// Assignment numbers whose most recent score asks for a resubmission,
/// either below `pass_mark` or worded that way.
pub(crate) async fn failed_identifiers(
    store: &dyn DocumentStore,
    student_code: &str,
    pass_mark: f64,
) -> Result<BTreeSet<AssignmentNumber>, StoreError> {
    let docs = list_for_student(store, student_code).await?;

    let mut latest: BTreeMap<AssignmentNumber, (Option<OffsetDateTime>, ScoreState)> =
        BTreeMap::new();
    for doc in &docs {
        let (Some(label), Some(state)) = (assignment_label(doc), score_state(&doc.fields, pass_mark))
        else {
            continue;
        };
        let at = timestamp(doc);
        for number in label_numbers(&label) {
            match latest.get(&number) {
                Some((seen_at, _)) if *seen_at > at => {}
                _ => {
                    latest.insert(number, (at, state));
                }
            }
        }
    }

    Ok(latest
        .into_iter()
        .filter(|(_, (_, state))| *state == ScoreState::Resubmit)
        .map(|(number, _)| number)
        .collect())
}

pub(crate) async fn leaderboard_rows(store: &dyn DocumentStore) -> Result<Vec<ScoreRow>, StoreError> {
    let docs = store.stream(&collection()).await?;
    Ok(docs
        .iter()
        .filter_map(|doc| {
            Some(ScoreRow {
                student_code: student_code(doc)?,
                name: doc.text_field("name").unwrap_or_default(),
                assignment: assignment_label(doc)?,
                level: doc.text_field("level").unwrap_or_default(),
                score: numeric_score(&doc.fields),
            })
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::db::fields;
    use crate::db::memory::MemoryDocumentStore;

    async fn seed(store: &MemoryDocumentStore, value: serde_json::Value) {
        store.add(&collection(), fields(value)).await.unwrap();
    }

    fn number(value: f64) -> AssignmentNumber {
        AssignmentNumber::new(value).unwrap()
    }

    #[tokio::test]
    async fn failed_identifiers_use_latest_score_per_assignment() {
        let store = MemoryDocumentStore::new();
        seed(&store, json!({"studentcode": "S1", "assignment": "1.0", "score": "40%", "updated_at": "2025-09-01T00:00:00Z"})).await;
        seed(&store, json!({"studentcode": "S1", "assignment": "2.5", "score": 35, "updated_at": "2025-09-02T00:00:00Z"})).await;
        seed(&store, json!({"student_code": "s1", "assignment": "1", "score": 80, "updated_at": "2025-09-05T00:00:00Z"})).await;
        seed(&store, json!({"student_code": "s2", "assignment": "3", "score": 10})).await;

        let failed = failed_identifiers(&store, "s1", 60.0).await.unwrap();
        assert_eq!(failed, BTreeSet::from([number(2.5)]));
    }

    #[tokio::test]
    async fn failed_identifiers_read_summary_labels() {
        let store = MemoryDocumentStore::new();
        seed(&store, json!({"student_code": "s1", "assignment": "Day 3 – 1.0", "score": 30})).await;
        seed(&store, json!({"student_code": "s1", "assignment": "12.1,2,3", "score": 20})).await;
        seed(&store, json!({"student_code": "s1", "assignment": "Day 4 – 4.0", "score": 90})).await;

        let failed = failed_identifiers(&store, "s1", 60.0).await.unwrap();
        assert_eq!(failed, BTreeSet::from([number(1.0), number(12.1), number(12.2), number(12.3)]));
    }

    #[tokio::test]
    async fn failed_identifiers_follow_textual_outcomes() {
        let store = MemoryDocumentStore::new();
        seed(&store, json!({"student_code": "s1", "assignment": "1.0", "score": "Resubmission needed"})).await;
        seed(&store, json!({"student_code": "s1", "assignment": "2.0", "status": "Resubmission needed"})).await;
        seed(&store, json!({"student_code": "s1", "assignment": "3.0", "status": "Completed - no resubmission needed"})).await;
        seed(&store, json!({"student_code": "s1", "assignment": "5.0", "comment": "ungraded"})).await;

        let failed = failed_identifiers(&store, "s1", 60.0).await.unwrap();
        assert_eq!(failed, BTreeSet::from([number(1.0), number(2.0)]));
    }

    #[tokio::test]
    async fn latest_score_matches_lesson_or_submission() {
        let store = MemoryDocumentStore::new();
        seed(&store, json!({"student_code": "s1", "lesson_key": "k", "score": 40, "updated_at": "2025-09-01T00:00:00Z"})).await;
        seed(&store, json!({"student_code": "s1", "submission_id": "sub-1", "score": 75, "graded_at": "2025-09-03T00:00:00Z"})).await;
        seed(&store, json!({"student_code": "s1", "lesson_key": "other", "score": 99, "updated_at": "2025-09-09T00:00:00Z"})).await;

        let by_key = fetch_latest_score(&store, "s1", "k", None).await.unwrap().expect("score");
        assert_eq!(numeric_score(&by_key.fields), Some(40.0));

        let with_id = fetch_latest_score(&store, "S1", "k", Some("sub-1")).await.unwrap().expect("score");
        assert_eq!(numeric_score(&with_id.fields), Some(75.0));

        assert!(fetch_latest_score(&store, "s2", "k", None).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn leaderboard_rows_skip_unlabelled_scores() {
        let store = MemoryDocumentStore::new();
        seed(&store, json!({"studentcode": "s1", "name": "Ama", "assignment": "A", "score": "85", "level": "A1"})).await;
        seed(&store, json!({"studentcode": "s1", "score": "85", "level": "A1"})).await;

        let rows = leaderboard_rows(&store).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].score, Some(85.0));
        assert_eq!(rows[0].name, "Ama");
    }
}
