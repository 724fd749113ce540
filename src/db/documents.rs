use std::fmt;

use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;

pub(crate) type Fields = Map<String, Value>;

#[derive(Debug, Error)]
pub(crate) enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("stored document at {path} is not an object")]
    Corrupt { path: String },
}

/// Path of a collection: an odd number of segments (`class_board/A1/classes`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct CollectionPath(String);

/// Path of a document: an even number of segments (`scores/abc`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct DocPath {
    collection: CollectionPath,
    id: String,
}

impl CollectionPath {
    pub(crate) fn root(name: &str) -> Self {
        Self(segment(name))
    }

    pub(crate) fn doc(&self, id: &str) -> DocPath {
        DocPath { collection: self.clone(), id: segment(id) }
    }

    pub(crate) fn as_str(&self) -> &str {
        &self.0
    }
}

impl DocPath {
    pub(crate) fn collection(&self, name: &str) -> CollectionPath {
        CollectionPath(format!("{}/{}/{}", self.collection.0, self.id, segment(name)))
    }

    pub(crate) fn parent(&self) -> &CollectionPath {
        &self.collection
    }

    pub(crate) fn id(&self) -> &str {
        &self.id
    }

    pub(crate) fn to_path_string(&self) -> String {
        format!("{}/{}", self.collection.0, self.id)
    }
}

impl fmt::Display for CollectionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for DocPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.collection.0, self.id)
    }
}

/// Segments never contain `/` and are never empty, so any user-supplied
/// class name or code maps to exactly one path segment.
fn segment(raw: &str) -> String {
    let cleaned = raw.trim().replace('/', "_");
    if cleaned.is_empty() {
        "_".to_string()
    } else {
        cleaned
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Document {
    pub(crate) id: String,
    pub(crate) fields: Fields,
}

impl Document {
    pub(crate) fn str_field(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(Value::as_str)
    }

    /// String view of a scalar field, trimmed; numbers are rendered as text.
    pub(crate) fn text_field(&self, key: &str) -> Option<String> {
        match self.fields.get(key)? {
            Value::String(text) => {
                let trimmed = text.trim();
                (!trimmed.is_empty()).then(|| trimmed.to_string())
            }
            Value::Number(number) => Some(number.to_string()),
            Value::Bool(flag) => Some(flag.to_string()),
            _ => None,
        }
    }

    pub(crate) fn bool_field(&self, key: &str) -> bool {
        self.fields.get(key).and_then(Value::as_bool).unwrap_or(false)
    }

    pub(crate) fn f64_field(&self, key: &str) -> Option<f64> {
        self.fields.get(key).and_then(Value::as_f64)
    }
}

/// Schemaless nested document store. Implementations: Postgres
/// (`PgDocumentStore`) and in-process (`MemoryDocumentStore`).
#[async_trait]
pub(crate) trait DocumentStore: Send + Sync {
    async fn get(&self, path: &DocPath) -> Result<Option<Document>, StoreError>;

    /// Replace the document, creating it when absent.
    async fn set(&self, path: &DocPath, fields: Fields) -> Result<(), StoreError>;

    /// Deep-merge `fields` into the document, creating it when absent.
    async fn merge(&self, path: &DocPath, fields: Fields) -> Result<(), StoreError>;

    /// Create only when absent. Returns `false` if the document already existed.
    async fn create(&self, path: &DocPath, fields: Fields) -> Result<bool, StoreError>;

    /// Insert under a generated id and return it.
    async fn add(&self, collection: &CollectionPath, fields: Fields) -> Result<String, StoreError>;

    /// Direct children of `collection` in insertion order.
    async fn stream(&self, collection: &CollectionPath) -> Result<Vec<Document>, StoreError>;

    async fn delete(&self, path: &DocPath) -> Result<(), StoreError>;

    /// Readiness probe used by `/healthz`.
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

pub(crate) fn merge_fields(target: &mut Fields, patch: Fields) {
    for (key, value) in patch {
        match (target.get_mut(&key), value) {
            (Some(Value::Object(existing)), Value::Object(incoming)) => {
                merge_fields(existing, incoming);
            }
            (_, value) => {
                target.insert(key, value);
            }
        }
    }
}

pub(crate) fn new_document_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

/// Build a `Fields` map from a `json!({...})` literal. Non-objects yield an empty map.
pub(crate) fn fields(value: Value) -> Fields {
    match value {
        Value::Object(map) => map,
        _ => Fields::new(),
    }
}
