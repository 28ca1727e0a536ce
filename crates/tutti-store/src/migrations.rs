//! Database migration runner.
//!
//! Embeds the SQL migration files at compile time and executes them on
//! open. Statements use `IF NOT EXISTS`, so re-running is harmless.

use crate::error::StoreError;
use crate::libsql_store::LibsqlStore;

/// Document table plus collection index.
const MIGRATION_001: &str = include_str!("../migrations/001_documents.sql");

impl LibsqlStore {
    /// Run all embedded migrations in sequence.
    pub(crate) async fn run_migrations(&self) -> Result<(), StoreError> {
        self.conn()
            .execute_batch(MIGRATION_001)
            .await
            .map_err(|e| StoreError::Migration(format!("001_documents: {e}")))?;
        Ok(())
    }
}
