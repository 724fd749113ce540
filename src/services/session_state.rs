use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{json, Value};

pub(crate) const CHAT_BASE_KEY: &str = "cchat_data_chat";
pub(crate) const QCOUNT_BASE_KEY: &str = "cchat_data_qcount";
pub(crate) const FINALIZED_BASE_KEY: &str = "cchat_data_finalized";
pub(crate) const ACTIVE_IDENTITY_KEY: &str = "_cchat_active_identity";

/// Per-user page state, passed explicitly to the initialisers that fill it.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub(crate) struct SessionState(BTreeMap<String, Value>);

impl SessionState {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub(crate) fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub(crate) fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.0.insert(key.into(), value);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct TopicCoachKeys {
    pub(crate) chat: String,
    pub(crate) qcount: String,
    pub(crate) finalized: String,
}

fn safe_part(raw: &str) -> &str {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        "unknown"
    } else {
        trimmed
    }
}

pub(crate) fn topic_coach_state_key(base: &str, student_code: &str, level: &str) -> String {
    format!(
        "{}__{}__{}",
        base,
        safe_part(student_code),
        safe_part(level).to_uppercase()
    )
}

/// Load one student's topic-coach chat into `state` under keys scoped to that
/// student and level. Returns the keys written.
pub(crate) fn initialise_topic_coach_session_state(
    state: &mut SessionState,
    student_code: &str,
    level: &str,
    messages: Vec<Value>,
    qcount: u64,
    finalized: bool,
) -> TopicCoachKeys {
    let keys = TopicCoachKeys {
        chat: topic_coach_state_key(CHAT_BASE_KEY, student_code, level),
        qcount: topic_coach_state_key(QCOUNT_BASE_KEY, student_code, level),
        finalized: topic_coach_state_key(FINALIZED_BASE_KEY, student_code, level),
    };

    state.insert(keys.chat.clone(), Value::Array(messages));
    state.insert(keys.qcount.clone(), json!(qcount));
    state.insert(keys.finalized.clone(), Value::Bool(finalized));
    state.insert(
        ACTIVE_IDENTITY_KEY,
        json!([safe_part(student_code), safe_part(level).to_uppercase()]),
    );

    keys
}
