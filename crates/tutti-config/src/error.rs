//! Errors raised while loading Tutti configuration.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    /// A TOML file or `TUTTI_*` variable could not be merged or extracted.
    #[error("Configuration error: {0}")]
    Figment(#[from] figment::Error),

    /// `.env` exists but could not be parsed.
    #[error("Failed to read .env: {0}")]
    DotEnv(#[source] dotenvy::Error),

    /// A value parsed but is out of range for Tutti.
    #[error("Invalid configuration value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}
