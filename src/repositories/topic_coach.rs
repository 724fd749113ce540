use serde::Serialize;
use serde_json::{json, Value};

use crate::core::time::now_rfc3339;
use crate::db::{fields, CollectionPath, DocPath, DocumentStore, StoreError};

fn chat_doc(student_code: &str) -> DocPath {
    CollectionPath::root("falowen_chats").doc(student_code)
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub(crate) struct TopicCoachChat {
    pub(crate) messages: Vec<Value>,
    pub(crate) qcount: u64,
    pub(crate) finalized: bool,
}

pub(crate) async fn load(
    store: &dyn DocumentStore,
    student_code: &str,
) -> Result<TopicCoachChat, StoreError> {
    let Some(doc) = store.get(&chat_doc(student_code)).await? else {
        return Ok(TopicCoachChat::default());
    };

    let messages = doc
        .fields
        .get("chats")
        .and_then(|chats| chats.get("topic_coach"))
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();
    let meta = doc.fields.get("topic_coach_meta");
    let qcount = meta.and_then(|meta| meta.get("qcount")).and_then(Value::as_u64).unwrap_or(0);
    let finalized =
        meta.and_then(|meta| meta.get("finalized")).and_then(Value::as_bool).unwrap_or(false);

    Ok(TopicCoachChat { messages, qcount, finalized })
}

/// Merge the chat into the student's document. Failures are logged and
/// reported as `false`.
pub(crate) async fn persist(store: &dyn DocumentStore, student_code: &str, chat: &TopicCoachChat) -> bool {
    let patch = fields(json!({
        "chats": {"topic_coach": chat.messages},
        "topic_coach_meta": {"qcount": chat.qcount, "finalized": chat.finalized},
        "updated_at": now_rfc3339(),
    }));

    match store.merge(&chat_doc(student_code), patch).await {
        Ok(()) => true,
        Err(err) => {
            tracing::warn!(student_code, error = %err, "Failed to persist topic coach chat");
            false
        }
    }
}
