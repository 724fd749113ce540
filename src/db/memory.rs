use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::documents::{
    merge_fields, new_document_id, CollectionPath, DocPath, Document, DocumentStore, Fields,
    StoreError,
};

#[derive(Debug)]
struct Entry {
    seq: u64,
    collection: String,
    fields: Fields,
}

/// In-process store used by tests and local development without Postgres.
#[derive(Debug, Default)]
pub(crate) struct MemoryDocumentStore {
    docs: RwLock<HashMap<String, Entry>>,
    seq: AtomicU64,
}

impl MemoryDocumentStore {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn next_seq(&self) -> u64 {
        self.seq.fetch_add(1, Ordering::Relaxed)
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn get(&self, path: &DocPath) -> Result<Option<Document>, StoreError> {
        let docs = self.docs.read().await;
        Ok(docs
            .get(&path.to_path_string())
            .map(|entry| Document { id: path.id().to_string(), fields: entry.fields.clone() }))
    }

    async fn set(&self, path: &DocPath, fields: Fields) -> Result<(), StoreError> {
        let seq = self.next_seq();
        let mut docs = self.docs.write().await;
        match docs.get_mut(&path.to_path_string()) {
            Some(entry) => entry.fields = fields,
            None => {
                docs.insert(
                    path.to_path_string(),
                    Entry { seq, collection: path.parent().as_str().to_string(), fields },
                );
            }
        }
        Ok(())
    }

    async fn merge(&self, path: &DocPath, fields: Fields) -> Result<(), StoreError> {
        let seq = self.next_seq();
        let mut docs = self.docs.write().await;
        match docs.get_mut(&path.to_path_string()) {
            Some(entry) => merge_fields(&mut entry.fields, fields),
            None => {
                let mut fresh = Fields::new();
                merge_fields(&mut fresh, fields);
                docs.insert(
                    path.to_path_string(),
                    Entry { seq, collection: path.parent().as_str().to_string(), fields: fresh },
                );
            }
        }
        Ok(())
    }

    async fn create(&self, path: &DocPath, fields: Fields) -> Result<bool, StoreError> {
        let seq = self.next_seq();
        let mut docs = self.docs.write().await;
        let key = path.to_path_string();
        if docs.contains_key(&key) {
            return Ok(false);
        }
        docs.insert(key, Entry { seq, collection: path.parent().as_str().to_string(), fields });
        Ok(true)
    }

    async fn add(&self, collection: &CollectionPath, fields: Fields) -> Result<String, StoreError> {
        let id = new_document_id();
        self.set(&collection.doc(&id), fields).await?;
        Ok(id)
    }

    async fn stream(&self, collection: &CollectionPath) -> Result<Vec<Document>, StoreError> {
        let docs = self.docs.read().await;
        let prefix = format!("{}/", collection.as_str());
        let mut matches: Vec<(u64, Document)> = docs
            .iter()
            .filter(|(_, entry)| entry.collection == collection.as_str())
            .map(|(path, entry)| {
                let id = path.strip_prefix(&prefix).unwrap_or(path).to_string();
                (entry.seq, Document { id, fields: entry.fields.clone() })
            })
            .collect();
        matches.sort_by_key(|(seq, _)| *seq);
        Ok(matches.into_iter().map(|(_, doc)| doc).collect())
    }

    async fn delete(&self, path: &DocPath) -> Result<(), StoreError> {
        self.docs.write().await.remove(&path.to_path_string());
        Ok(())
    }
}
