//! General application configuration.

use serde::{Deserialize, Serialize};

fn default_log_level() -> String {
    "warn".to_string()
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GeneralConfig {
    /// Default tracing filter when neither `TUTTI_LOG` nor a CLI flag is set.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}
