//! # tutti-store
//!
//! The record store Tutti keeps lesson and student documents in.
//!
//! Documents are JSON objects addressed by `/{collection}/{id}` paths and
//! changed through partial updates (`$push`, `$pull`, `$inc`, `$set`) with
//! positional array filters and preconditions. Two implementations ship:
//!
//! - [`MemoryStore`] for tests and embedding
//! - [`LibsqlStore`], a `documents` table in a local libSQL database
//!
//! Both evaluate updates with the same code in [`apply`], so a patch either
//! applies completely or leaves the document untouched.

pub mod apply;
pub mod error;
pub mod libsql_store;
pub mod memory;
mod migrations;
pub mod path;
pub mod retry;
pub mod update;

use std::future::Future;

use serde_json::Value;

pub use error::StoreError;
pub use libsql_store::LibsqlStore;
pub use memory::MemoryStore;
pub use path::DocPath;
pub use retry::RetryConfig;
pub use update::{ArrayFilter, PatchOptions, Precondition, TransactionHandle, UpdateBuilder, UpdateSpec};

/// Document store the enrollment service reads and writes through.
///
/// Every operation is a single request; implementations must make each
/// `patch` atomic with respect to other patches on the same document.
pub trait RecordStore: Send + Sync {
    /// Fetch the document at `/{collection}/{id}`.
    fn get(&self, path: &str) -> impl Future<Output = Result<Value, StoreError>> + Send;

    /// Apply `update` to the document at `path` and return the result.
    ///
    /// Preconditions are checked against the stored document first; on
    /// failure nothing is written.
    fn patch(
        &self,
        path: &str,
        update: &UpdateSpec,
        options: &PatchOptions,
    ) -> impl Future<Output = Result<Value, StoreError>> + Send;

    /// Insert `body` into the collection at `path`, or replace the document
    /// named by `body.id`. Returns the stored document, including its id.
    fn post(&self, path: &str, body: Value) -> impl Future<Output = Result<Value, StoreError>> + Send;
}

/// Split a posted body into its id (if any) and the object to store.
pub(crate) fn post_body(
    path: &str,
    body: Value,
) -> Result<(Option<String>, serde_json::Map<String, Value>), StoreError> {
    let Value::Object(map) = body else {
        return Err(StoreError::InvalidDocument(format!(
            "body posted to {path} is not a JSON object"
        )));
    };
    let id = match map.get("id") {
        None | Some(Value::Null) => None,
        Some(Value::String(id)) if !id.is_empty() => Some(id.clone()),
        Some(other) => {
            return Err(StoreError::InvalidDocument(format!(
                "id must be a non-empty string, got {other}"
            )));
        }
    };
    Ok((id, map))
}
