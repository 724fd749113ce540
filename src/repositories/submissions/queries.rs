use crate::core::time::parse_rfc3339;
use crate::db::{Document, DocumentStore, StoreError};

use super::{lock_path, posts, same_student};

pub(crate) async fn list_for_student(
    store: &dyn DocumentStore,
    level: &str,
    student_code: &str,
) -> Result<Vec<Document>, StoreError> {
    let docs = store.stream(&posts(level)).await?;
    Ok(docs.into_iter().filter(|doc| same_student(doc, student_code)).collect())
}

async fn list_for_lesson(
    store: &dyn DocumentStore,
    level: &str,
    student_code: &str,
    lesson_key: &str,
) -> Result<Vec<Document>, StoreError> {
    let docs = list_for_student(store, level, student_code).await?;
    Ok(docs.into_iter().filter(|doc| doc.str_field("lesson_key") == Some(lesson_key)).collect())
}

pub(crate) async fn has_existing_submission(
    store: &dyn DocumentStore,
    level: &str,
    student_code: &str,
    lesson_key: &str,
) -> Result<bool, StoreError> {
    Ok(!list_for_lesson(store, level, student_code, lesson_key).await?.is_empty())
}

/// Most recently updated submission; ties go to the later write.
pub(crate) async fn fetch_latest(
    store: &dyn DocumentStore,
    level: &str,
    student_code: &str,
    lesson_key: &str,
) -> Result<Option<Document>, StoreError> {
    let docs = list_for_lesson(store, level, student_code, lesson_key).await?;
    Ok(docs.into_iter().max_by_key(|doc| {
        doc.str_field("updated_at")
            .or_else(|| doc.str_field("created_at"))
            .and_then(parse_rfc3339)
    }))
}

/// A lesson is locked once a submission exists or a lock document is held.
/// A latest submission flagged `needs_resubmit` leaves the lesson open.
pub(crate) async fn is_locked(
    store: &dyn DocumentStore,
    level: &str,
    student_code: &str,
    lesson_key: &str,
) -> Result<bool, StoreError> {
    if let Some(latest) = fetch_latest(store, level, student_code, lesson_key).await? {
        return Ok(!latest.bool_field("needs_resubmit"));
    }
    Ok(store.get(&lock_path(level, student_code, lesson_key)).await?.is_some())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::db::fields;
    use crate::db::memory::MemoryDocumentStore;
    use crate::repositories::submissions::{acquire_lock, create, release_lock, CreateSubmission};

    fn submission<'a>(code: &'a str, answer: &'a str) -> CreateSubmission<'a> {
        CreateSubmission {
            level: "A1",
            student_code: code,
            student_name: "Ama",
            lesson_key: "A1_day1_ch1_0",
            chapter: "1.0",
            answer,
            needs_resubmit: false,
            resubmission: false,
        }
    }

    #[tokio::test]
    async fn existing_submission_is_scoped_to_student_and_lesson() {
        let store = MemoryDocumentStore::new();
        create(&store, submission("S1", "Hallo")).await.unwrap();

        assert!(has_existing_submission(&store, "A1", "s1", "A1_day1_ch1_0").await.unwrap());
        assert!(!has_existing_submission(&store, "A1", "s2", "A1_day1_ch1_0").await.unwrap());
        assert!(!has_existing_submission(&store, "A1", "s1", "A1_day2_ch2").await.unwrap());
        assert!(!has_existing_submission(&store, "A2", "s1", "A1_day1_ch1_0").await.unwrap());
    }

    #[tokio::test]
    async fn lock_is_exclusive_until_released() {
        let store = MemoryDocumentStore::new();

        assert!(!is_locked(&store, "A1", "s1", "k").await.unwrap());
        assert!(acquire_lock(&store, "A1", "s1", "k").await.unwrap());
        assert!(!acquire_lock(&store, "A1", "s1", "k").await.unwrap());
        assert!(is_locked(&store, "A1", "s1", "k").await.unwrap());

        release_lock(&store, "A1", "s1", "k").await.unwrap();
        assert!(!is_locked(&store, "A1", "s1", "k").await.unwrap());
        assert!(acquire_lock(&store, "A1", "s1", "k").await.unwrap());
    }

    #[tokio::test]
    async fn submission_flagged_for_resubmit_leaves_lesson_open() {
        let store = MemoryDocumentStore::new();
        let short = CreateSubmission { needs_resubmit: true, ..submission("s1", "zu kurz") };
        create(&store, short).await.unwrap();
        assert!(!is_locked(&store, "A1", "s1", "A1_day1_ch1_0").await.unwrap());

        create(&store, submission("s1", "Hallo")).await.unwrap();
        assert!(is_locked(&store, "A1", "s1", "A1_day1_ch1_0").await.unwrap());
    }

    #[tokio::test]
    async fn latest_submission_follows_updated_at() {
        let store = MemoryDocumentStore::new();
        let posts = posts("A1");
        for (answer, updated_at) in [
            ("second", "2025-09-22T10:00:00Z"),
            ("first", "2025-09-21T10:00:00Z"),
        ] {
            store
                .add(
                    &posts,
                    fields(json!({
                        "student_code": "s1",
                        "lesson_key": "k",
                        "answer": answer,
                        "updated_at": updated_at,
                    })),
                )
                .await
                .unwrap();
        }

        let latest = fetch_latest(&store, "A1", "s1", "k").await.unwrap().expect("latest");
        assert_eq!(latest.str_field("answer"), Some("second"));
        assert!(fetch_latest(&store, "A1", "s2", "k").await.unwrap().is_none());
    }
}
