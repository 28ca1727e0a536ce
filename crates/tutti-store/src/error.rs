//! Record store error types.

use thiserror::Error;

/// Errors from record store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No document exists at the path.
    #[error("Record not found: {path}")]
    NotFound { path: String },

    /// The path is not `/{collection}/{id}` (or `/{collection}` for posts).
    #[error("Invalid record path: {0}")]
    InvalidPath(String),

    /// The update spec cannot be applied to the document.
    #[error("Invalid update: {0}")]
    InvalidUpdate(String),

    /// A posted body is not a JSON object.
    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    /// A patch precondition did not hold; the document was left untouched.
    #[error("Precondition failed on {path}: {reason}")]
    PreconditionFailed { path: String, reason: String },

    /// A document body could not be encoded or decoded.
    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A SQL query failed.
    #[error("Query failed: {0}")]
    Query(String),

    /// Schema migration failed.
    #[error("Migration failed: {0}")]
    Migration(String),

    /// Underlying libSQL error.
    #[error("libSQL error: {0}")]
    LibSql(#[from] libsql::Error),

    /// Catch-all for unexpected errors.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl StoreError {
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    #[must_use]
    pub const fn is_precondition_failed(&self) -> bool {
        matches!(self, Self::PreconditionFailed { .. })
    }
}
