use async_trait::async_trait;
use serde_json::Value;
use sqlx::types::Json;
use sqlx::PgPool;

use super::documents::{
    merge_fields, new_document_id, CollectionPath, DocPath, Document, DocumentStore, Fields,
    StoreError,
};

/// Documents live in one `documents` table keyed by their full path.
#[derive(Clone)]
pub(crate) struct PgDocumentStore {
    pool: PgPool,
}

impl PgDocumentStore {
    pub(crate) fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn into_fields(path: &str, value: Value) -> Result<Fields, StoreError> {
    match value {
        Value::Object(map) => Ok(map),
        _ => Err(StoreError::Corrupt { path: path.to_string() }),
    }
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn get(&self, path: &DocPath) -> Result<Option<Document>, StoreError> {
        let key = path.to_path_string();
        let row = sqlx::query_as::<_, (Json<Value>,)>("SELECT fields FROM documents WHERE path = $1")
            .bind(&key)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|(Json(value),)| {
            Ok(Document { id: path.id().to_string(), fields: into_fields(&key, value)? })
        })
        .transpose()
    }

    async fn set(&self, path: &DocPath, fields: Fields) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO documents (path, collection, doc_id, fields)
             VALUES ($1, $2, $3, $4)
             ON CONFLICT (path) DO UPDATE
             SET fields = EXCLUDED.fields,
                 updated_at = now()",
        )
        .bind(path.to_path_string())
        .bind(path.parent().as_str())
        .bind(path.id())
        .bind(Json(Value::Object(fields)))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn merge(&self, path: &DocPath, fields: Fields) -> Result<(), StoreError> {
        let key = path.to_path_string();
        let mut tx = self.pool.begin().await?;

        let existing = sqlx::query_as::<_, (Json<Value>,)>(
            "SELECT fields FROM documents WHERE path = $1 FOR UPDATE",
        )
        .bind(&key)
        .fetch_optional(&mut *tx)
        .await?;

        let mut merged = match existing {
            Some((Json(value),)) => into_fields(&key, value)?,
            None => Fields::new(),
        };
        merge_fields(&mut merged, fields);

        sqlx::query(
            "INSERT INTO documents (path, collection, doc_id, fields)
             VALUES ($1, $2, $3, $4)
             ON CONFLICT (path) DO UPDATE
             SET fields = EXCLUDED.fields,
                 updated_at = now()",
        )
        .bind(&key)
        .bind(path.parent().as_str())
        .bind(path.id())
        .bind(Json(Value::Object(merged)))
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn create(&self, path: &DocPath, fields: Fields) -> Result<bool, StoreError> {
        let inserted = sqlx::query(
            "INSERT INTO documents (path, collection, doc_id, fields)
             VALUES ($1, $2, $3, $4)
             ON CONFLICT (path) DO NOTHING",
        )
        .bind(path.to_path_string())
        .bind(path.parent().as_str())
        .bind(path.id())
        .bind(Json(Value::Object(fields)))
        .execute(&self.pool)
        .await?
        .rows_affected();

        Ok(inserted == 1)
    }

    async fn add(&self, collection: &CollectionPath, fields: Fields) -> Result<String, StoreError> {
        let id = new_document_id();
        self.set(&collection.doc(&id), fields).await?;
        Ok(id)
    }

    async fn stream(&self, collection: &CollectionPath) -> Result<Vec<Document>, StoreError> {
        let rows = sqlx::query_as::<_, (String, String, Json<Value>)>(
            "SELECT path, doc_id, fields
             FROM documents
             WHERE collection = $1
             ORDER BY created_at, path",
        )
        .bind(collection.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|(path, id, Json(value))| Ok(Document { id, fields: into_fields(&path, value)? }))
            .collect()
    }

    async fn delete(&self, path: &DocPath) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM documents WHERE path = $1")
            .bind(path.to_path_string())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query_scalar::<_, i32>("SELECT 1").fetch_one(&self.pool).await?;
        Ok(())
    }
}
