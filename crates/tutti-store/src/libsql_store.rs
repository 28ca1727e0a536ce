//! libSQL-backed record store.
//!
//! Every document is one row of the `documents` table, keyed by
//! `(collection, id)` with the JSON body stored as text. A patch reads,
//! evaluates, and rewrites the body inside one transaction.

use libsql::Builder;
use serde_json::Value;
use tokio::sync::Mutex;
use tutti_core::ids::PREFIX_RECORD;

use crate::apply::{apply_update, check_preconditions};
use crate::error::StoreError;
use crate::path::{DocPath, parse_collection};
use crate::retry::{RetryConfig, with_retry};
use crate::update::{PatchOptions, UpdateSpec};
use crate::{RecordStore, post_body};

/// Record store over a local libSQL database file (or `":memory:"`).
pub struct LibsqlStore {
    #[allow(dead_code)]
    db: libsql::Database,
    conn: libsql::Connection,
    retry: RetryConfig,
    /// Serializes transactions on the shared connection.
    writes: Mutex<()>,
}

impl LibsqlStore {
    /// Open a local database at `path`, running migrations on first open.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the database cannot be opened or migrations
    /// fail.
    pub async fn open_local(path: &str) -> Result<Self, StoreError> {
        let db = Builder::new_local(path).build().await?;
        let conn = db.connect()?;
        let store = Self {
            db,
            conn,
            retry: RetryConfig::default(),
            writes: Mutex::new(()),
        };
        store.run_migrations().await?;
        tracing::debug!(path, "libsql store opened");
        Ok(store)
    }

    /// Replace the retry policy for transient lock errors.
    #[must_use]
    pub fn with_retry_config(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Access the underlying libSQL connection for direct queries.
    #[must_use]
    pub const fn conn(&self) -> &libsql::Connection {
        &self.conn
    }

    /// Generate a record ID via libSQL, e.g. `"rec-a3f8b2c1"`.
    async fn generate_id(&self) -> Result<String, StoreError> {
        let mut rows = self
            .conn
            .query(
                &format!("SELECT '{PREFIX_RECORD}-' || lower(hex(randomblob(4)))"),
                (),
            )
            .await?;
        let row = rows
            .next()
            .await?
            .ok_or_else(|| StoreError::Query("id generation returned no rows".into()))?;
        Ok(row.get::<String>(0)?)
    }

    /// All documents in `collection`, ordered by id.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the query fails or a body is not valid JSON.
    pub async fn documents(&self, collection: &str) -> Result<Vec<Value>, StoreError> {
        let mut rows = self
            .conn
            .query(
                "SELECT body FROM documents WHERE collection = ?1 ORDER BY id",
                [collection],
            )
            .await?;
        let mut docs = Vec::new();
        while let Some(row) = rows.next().await? {
            docs.push(serde_json::from_str(&row.get::<String>(0)?)?);
        }
        Ok(docs)
    }

    async fn fetch(conn: &libsql::Connection, doc_path: &DocPath) -> Result<Value, StoreError> {
        let mut rows = conn
            .query(
                "SELECT body FROM documents WHERE collection = ?1 AND id = ?2",
                [doc_path.collection.as_str(), doc_path.id.as_str()],
            )
            .await?;
        let row = rows.next().await?.ok_or_else(|| StoreError::NotFound {
            path: doc_path.to_string(),
        })?;
        Ok(serde_json::from_str(&row.get::<String>(0)?)?)
    }

    async fn patch_in(
        conn: &libsql::Connection,
        doc_path: &DocPath,
        update: &UpdateSpec,
        options: &PatchOptions,
    ) -> Result<Value, StoreError> {
        let stored = Self::fetch(conn, doc_path).await?;
        let path = doc_path.to_string();
        check_preconditions(&stored, &options.preconditions, &path)?;

        let mut next = stored;
        apply_update(&mut next, update, &options.array_filters)?;
        let body = serde_json::to_string(&next)?;
        conn.execute(
            "UPDATE documents SET body = ?1, updated_at = datetime('now')
             WHERE collection = ?2 AND id = ?3",
            [body.as_str(), doc_path.collection.as_str(), doc_path.id.as_str()],
        )
        .await?;
        Ok(next)
    }

    async fn patch_once(
        &self,
        doc_path: &DocPath,
        update: &UpdateSpec,
        options: &PatchOptions,
    ) -> Result<Value, StoreError> {
        let tx = self.conn.transaction().await?;
        match Self::patch_in(&tx, doc_path, update, options).await {
            Ok(doc) => {
                tx.commit().await?;
                Ok(doc)
            }
            Err(error) => {
                if let Err(rollback) = tx.rollback().await {
                    tracing::warn!(%rollback, path = %doc_path, "libsql store: rollback failed");
                }
                Err(error)
            }
        }
    }

    async fn upsert(&self, doc_path: &DocPath, doc: &Value) -> Result<(), StoreError> {
        let body = serde_json::to_string(doc)?;
        self.conn
            .execute(
                "INSERT INTO documents (collection, id, body) VALUES (?1, ?2, ?3)
                 ON CONFLICT (collection, id)
                 DO UPDATE SET body = excluded.body, updated_at = datetime('now')",
                [doc_path.collection.as_str(), doc_path.id.as_str(), body.as_str()],
            )
            .await?;
        Ok(())
    }
}

impl RecordStore for LibsqlStore {
    async fn get(&self, path: &str) -> Result<Value, StoreError> {
        let doc_path = DocPath::parse(path)?;
        with_retry(&self.retry, "get", || Self::fetch(&self.conn, &doc_path)).await
    }

    async fn patch(
        &self,
        path: &str,
        update: &UpdateSpec,
        options: &PatchOptions,
    ) -> Result<Value, StoreError> {
        let doc_path = DocPath::parse(path)?;
        let _guard = self.writes.lock().await;
        let doc = with_retry(&self.retry, "patch", || {
            self.patch_once(&doc_path, update, options)
        })
        .await?;
        tracing::debug!(
            path,
            transaction = ?options.transaction,
            filters = %options.array_filters_json(),
            "libsql store: patched"
        );
        Ok(doc)
    }

    async fn post(&self, path: &str, body: Value) -> Result<Value, StoreError> {
        let collection = parse_collection(path)?;
        let (id, mut map) = post_body(path, body)?;
        let id = match id {
            Some(id) => id,
            None => self.generate_id().await?,
        };
        map.insert("id".into(), Value::String(id.clone()));
        let doc = Value::Object(map);
        let doc_path = DocPath::new(&collection, &id);

        let _guard = self.writes.lock().await;
        with_retry(&self.retry, "post", || self.upsert(&doc_path, &doc)).await?;
        tracing::debug!(collection, id, "libsql store: posted");
        Ok(doc)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    async fn test_store() -> LibsqlStore {
        LibsqlStore::open_local(":memory:").await.unwrap()
    }

    #[tokio::test]
    async fn open_local_creates_documents_table() {
        let store = test_store().await;
        let mut rows = store
            .conn()
            .query(
                "SELECT name FROM sqlite_master WHERE type='table' AND name='documents'",
                (),
            )
            .await
            .unwrap();
        assert!(rows.next().await.unwrap().is_some());
    }

    #[tokio::test]
    async fn idempotent_migrations() {
        let store = test_store().await;
        store.run_migrations().await.unwrap();
    }

    #[tokio::test]
    async fn generated_ids_have_record_prefix() {
        let store = test_store().await;
        let doc = store.post("/system/errors", json!({"severity": "critical"})).await.unwrap();
        let id = doc["id"].as_str().unwrap();
        assert!(id.starts_with("rec-"), "unexpected id {id}");
        assert_eq!(id.len(), 12);
        assert!(id[4..].chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[tokio::test]
    async fn post_replaces_existing_id() {
        let store = test_store().await;
        store.post("/student", json!({"id": "stu-01", "isActive": true})).await.unwrap();
        store.post("/student", json!({"id": "stu-01", "isActive": false})).await.unwrap();
        let docs = store.documents("student").await.unwrap();
        assert_eq!(docs, vec![json!({"id": "stu-01", "isActive": false})]);
    }
}
