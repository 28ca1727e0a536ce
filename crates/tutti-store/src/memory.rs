//! In-memory record store.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use serde_json::Value;
use tutti_core::ids::PREFIX_RECORD;

use crate::apply::{apply_update, check_preconditions};
use crate::error::StoreError;
use crate::path::{DocPath, parse_collection};
use crate::update::{PatchOptions, UpdateSpec};
use crate::{RecordStore, post_body};

/// A `Mutex<HashMap>`-backed store.
///
/// Each operation holds the lock for its whole read-evaluate-write, so
/// patches on one store are serialized.
#[derive(Debug, Default)]
pub struct MemoryStore {
    docs: Mutex<HashMap<DocPath, Value>>,
    next_id: AtomicU64,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All documents in `collection`, ordered by id.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Other` if the lock was poisoned.
    pub fn documents(&self, collection: &str) -> Result<Vec<Value>, StoreError> {
        let docs = self.lock()?;
        let mut found = docs
            .iter()
            .filter(|(path, _)| path.collection == collection)
            .map(|(path, doc)| (path.id.clone(), doc.clone()))
            .collect::<Vec<_>>();
        found.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(found.into_iter().map(|(_, doc)| doc).collect())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<DocPath, Value>>, StoreError> {
        self.docs
            .lock()
            .map_err(|e| StoreError::Other(anyhow::anyhow!("memory store lock poisoned: {e}")))
    }

    fn generate_id(&self) -> String {
        let n = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        format!("{PREFIX_RECORD}-{n:08x}")
    }
}

impl RecordStore for MemoryStore {
    async fn get(&self, path: &str) -> Result<Value, StoreError> {
        let doc_path = DocPath::parse(path)?;
        self.lock()?
            .get(&doc_path)
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                path: path.to_string(),
            })
    }

    async fn patch(
        &self,
        path: &str,
        update: &UpdateSpec,
        options: &PatchOptions,
    ) -> Result<Value, StoreError> {
        let doc_path = DocPath::parse(path)?;
        let mut docs = self.lock()?;
        let stored = docs.get_mut(&doc_path).ok_or_else(|| StoreError::NotFound {
            path: path.to_string(),
        })?;

        check_preconditions(stored, &options.preconditions, path)?;
        let mut next = stored.clone();
        apply_update(&mut next, update, &options.array_filters)?;
        *stored = next.clone();

        tracing::debug!(
            path,
            transaction = ?options.transaction,
            filters = %options.array_filters_json(),
            "memory store: patched"
        );
        Ok(next)
    }

    async fn post(&self, path: &str, body: Value) -> Result<Value, StoreError> {
        let collection = parse_collection(path)?;
        let (id, mut map) = post_body(path, body)?;
        let id = id.unwrap_or_else(|| self.generate_id());
        map.insert("id".into(), Value::String(id.clone()));
        let doc = Value::Object(map);

        let replaced = self
            .lock()?
            .insert(DocPath::new(&collection, &id), doc.clone())
            .is_some();
        tracing::debug!(collection, id, replaced, "memory store: posted");
        Ok(doc)
    }
}
