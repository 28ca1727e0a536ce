use anyhow::Context;
use tutti_config::TuttiConfig;
use tutti_enroll::EnrollmentService;
use tutti_store::LibsqlStore;

use crate::bootstrap;

/// Shared application resources initialized once at startup.
pub struct AppContext {
    pub service: EnrollmentService<LibsqlStore>,
}

impl AppContext {
    /// Open the configured store and build the enrollment service on it.
    pub async fn init(config: TuttiConfig, db_override: Option<&str>) -> anyhow::Result<Self> {
        let path = bootstrap::store_path(db_override, &config.store).to_string();
        bootstrap::ensure_parent_dir(&path)?;

        let store = LibsqlStore::open_local(&path)
            .await
            .with_context(|| format!("failed to open record store at {path}"))?
            .with_retry_config(bootstrap::retry_config(&config.store));
        tracing::debug!(path = %path, "record store ready");

        Ok(Self {
            service: EnrollmentService::new(store, config.enrollment),
        })
    }
}
