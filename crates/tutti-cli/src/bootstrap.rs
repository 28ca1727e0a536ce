use std::path::Path;

use anyhow::Context;
use tutti_config::{StoreConfig, TuttiConfig};
use tutti_store::RetryConfig;

/// Load `.env` (if present) and the layered config.
pub fn load_config() -> anyhow::Result<TuttiConfig> {
    TuttiConfig::load_with_dotenv().context("failed to load tutti configuration")
}

/// Database path to open: `--db` wins over `store.path`.
pub fn store_path<'a>(db_override: Option<&'a str>, config: &'a StoreConfig) -> &'a str {
    db_override.unwrap_or(&config.path)
}

/// Create the parent directory of an on-disk database.
pub fn ensure_parent_dir(path: &str) -> anyhow::Result<()> {
    if path == ":memory:" {
        return Ok(());
    }
    if let Some(parent) = Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("failed to create database directory {}", parent.display())
            })?;
        }
    }
    Ok(())
}

pub fn retry_config(config: &StoreConfig) -> RetryConfig {
    RetryConfig {
        max_attempts: config.retry_max_attempts,
        base_delay: config.retry_base_delay(),
        max_delay: config.retry_max_delay(),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn db_flag_overrides_config_path() {
        let config = StoreConfig::default();
        assert_eq!(store_path(None, &config), ".tutti/tutti.db");
        assert_eq!(store_path(Some("/tmp/other.db"), &config), "/tmp/other.db");
    }

    #[test]
    fn retry_config_follows_store_section() {
        let config = StoreConfig {
            retry_max_attempts: 2,
            retry_base_delay_ms: 10,
            retry_max_delay_ms: 50,
            ..StoreConfig::default()
        };
        let retry = retry_config(&config);
        assert_eq!(retry.max_attempts, 2);
        assert_eq!(retry.base_delay, Duration::from_millis(10));
        assert_eq!(retry.max_delay, Duration::from_millis(50));
    }

    #[test]
    fn parent_dir_is_created_for_nested_paths() {
        let dir = tempfile::TempDir::new().unwrap();
        let db = dir.path().join("nested/deeper/tutti.db");
        ensure_parent_dir(db.to_str().unwrap()).unwrap();
        assert!(dir.path().join("nested/deeper").is_dir());
    }

    #[test]
    fn memory_and_bare_paths_need_no_directory() {
        ensure_parent_dir(":memory:").unwrap();
        ensure_parent_dir("tutti.db").unwrap();
    }
}
