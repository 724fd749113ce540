mod commands;
mod queries;

use crate::db::{CollectionPath, DocPath, Document};
use crate::services::lesson_keys::lock_id;

pub(crate) use commands::{acquire_lock, create, release_lock, CreateSubmission};
pub(crate) use queries::{fetch_latest, has_existing_submission, is_locked, list_for_student};

pub(crate) fn posts(level: &str) -> CollectionPath {
    CollectionPath::root("submissions").doc(level.trim()).collection("posts")
}

pub(crate) fn lock_path(level: &str, student_code: &str, lesson_key: &str) -> DocPath {
    CollectionPath::root("submission_locks").doc(&lock_id(level, student_code, lesson_key))
}

fn same_student(doc: &Document, student_code: &str) -> bool {
    doc.text_field("student_code")
        .is_some_and(|code| code.eq_ignore_ascii_case(student_code.trim()))
}
