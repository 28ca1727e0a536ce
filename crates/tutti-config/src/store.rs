//! Record store configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

fn default_path() -> String {
    ".tutti/tutti.db".to_string()
}

const fn default_retry_max_attempts() -> u32 {
    4
}

const fn default_retry_base_delay_ms() -> u64 {
    100
}

const fn default_retry_max_delay_ms() -> u64 {
    2000
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StoreConfig {
    /// libSQL database file, or `:memory:`.
    #[serde(default = "default_path")]
    pub path: String,

    /// Attempts (including the first) for transient lock errors.
    #[serde(default = "default_retry_max_attempts")]
    pub retry_max_attempts: u32,

    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,

    #[serde(default = "default_retry_max_delay_ms")]
    pub retry_max_delay_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_path(),
            retry_max_attempts: default_retry_max_attempts(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
            retry_max_delay_ms: default_retry_max_delay_ms(),
        }
    }
}

impl StoreConfig {
    #[must_use]
    pub const fn retry_base_delay(&self) -> Duration {
        Duration::from_millis(self.retry_base_delay_ms)
    }

    #[must_use]
    pub const fn retry_max_delay(&self) -> Duration {
        Duration::from_millis(self.retry_max_delay_ms)
    }

    /// Whether the store lives only in memory for this process.
    #[must_use]
    pub fn is_in_memory(&self) -> bool {
        self.path == ":memory:"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_correct() {
        let config = StoreConfig::default();
        assert_eq!(config.path, ".tutti/tutti.db");
        assert_eq!(config.retry_max_attempts, 4);
        assert_eq!(config.retry_base_delay(), Duration::from_millis(100));
        assert_eq!(config.retry_max_delay(), Duration::from_secs(2));
        assert!(!config.is_in_memory());
    }
}
