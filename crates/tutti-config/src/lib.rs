//! # tutti-config
//!
//! Layered configuration loading for Tutti using figment.
//!
//! Configuration sources (in priority order, highest wins):
//! 1. Environment variables (`TUTTI_*` prefix, `__` as separator)
//! 2. Project-level `.tutti/config.toml`
//! 3. User-level `~/.config/tutti/config.toml`
//! 4. Built-in defaults
//!
//! # Environment Variable Mapping
//!
//! Figment maps `TUTTI_STORE__PATH` -> `store.path`,
//! `TUTTI_ENROLLMENT__CAPACITY_GUARD` -> `enrollment.capacity_guard`, etc.
//! The `__` (double underscore) separates nested config sections.
//!
//! # Usage
//!
//! ```no_run
//! use tutti_config::TuttiConfig;
//!
//! let config = TuttiConfig::load_with_dotenv().expect("config");
//! println!("store: {}", config.store.path);
//! ```

mod enrollment;
mod error;
mod general;
mod store;

pub use enrollment::EnrollmentConfig;
pub use error::ConfigError;
pub use general::GeneralConfig;
pub use store::StoreConfig;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TuttiConfig {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub enrollment: EnrollmentConfig,
    #[serde(default)]
    pub general: GeneralConfig,
}

impl TuttiConfig {
    /// Load configuration from all sources (TOML files + environment variables).
    ///
    /// Does NOT call `dotenvy`; use [`Self::load_with_dotenv`] for `.env` support.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a source fails to parse or a value is invalid.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_figment(&Self::figment())
    }

    /// Load configuration after reading `.env` from the working directory
    /// or one of its parents. A missing `.env` is not an error.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::DotEnv` if `.env` exists but is malformed, or
    /// any error [`Self::load`] returns.
    pub fn load_with_dotenv() -> Result<Self, ConfigError> {
        match dotenvy::dotenv() {
            Ok(_) => {}
            Err(error) if error.not_found() => {}
            Err(error) => return Err(ConfigError::DotEnv(error)),
        }
        Self::load()
    }

    /// Extract and validate a config from an arbitrary figment.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if extraction fails or a value is invalid.
    pub fn from_figment(figment: &Figment) -> Result<Self, ConfigError> {
        let config: Self = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Build the figment provider chain.
    ///
    /// Public so tests can inspect the figment or layer extra providers.
    #[must_use]
    pub fn figment() -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        // Layer 1: User-global config
        if let Some(global_path) = Self::global_config_path() {
            if global_path.exists() {
                figment = figment.merge(Toml::file(global_path));
            }
        }

        // Layer 2: Project-local config
        let local_path = PathBuf::from(".tutti/config.toml");
        if local_path.exists() {
            figment = figment.merge(Toml::file(local_path));
        }

        // Layer 3: Environment variables (highest priority)
        figment.merge(Env::prefixed("TUTTI_").split("__"))
    }

    /// Path to the user-global config file.
    fn global_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("tutti").join("config.toml"))
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.store.retry_max_attempts == 0 {
            return Err(ConfigError::InvalidValue {
                field: "store.retry_max_attempts".into(),
                reason: "must be at least 1".into(),
            });
        }
        if self.store.retry_base_delay_ms > self.store.retry_max_delay_ms {
            return Err(ConfigError::InvalidValue {
                field: "store.retry_base_delay_ms".into(),
                reason: format!(
                    "{} exceeds retry_max_delay_ms ({})",
                    self.store.retry_base_delay_ms, self.store.retry_max_delay_ms
                ),
            });
        }
        if self.store.path.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "store.path".into(),
                reason: "must not be empty".into(),
            });
        }
        if !self.enrollment.error_sink_path.starts_with('/') {
            return Err(ConfigError::InvalidValue {
                field: "enrollment.error_sink_path".into(),
                reason: format!("'{}' is not an absolute collection path", self.enrollment.error_sink_path),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = TuttiConfig::default();
        assert!(config.validate().is_ok());
        assert!(config.enrollment.capacity_guard);
    }

    #[test]
    fn zero_attempts_rejected() {
        let mut config = TuttiConfig::default();
        config.store.retry_max_attempts = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { field, .. }) if field == "store.retry_max_attempts"
        ));
    }

    #[test]
    fn relative_error_sink_rejected() {
        let mut config = TuttiConfig::default();
        config.enrollment.error_sink_path = "system/errors".into();
        assert!(config.validate().is_err());
    }
}
