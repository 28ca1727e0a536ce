//! Enrollment service configuration.

use serde::{Deserialize, Serialize};
use tutti_core::ids::ERROR_SINK_PATH;

fn default_performed_by() -> String {
    "system".to_string()
}

fn default_error_sink_path() -> String {
    ERROR_SINK_PATH.to_string()
}

const fn default_capacity_guard() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EnrollmentConfig {
    /// Actor recorded in audit entries when a request names none.
    #[serde(default = "default_performed_by")]
    pub default_performed_by: String,

    /// Collection that receives critical error reports from rollbacks.
    #[serde(default = "default_error_sink_path")]
    pub error_sink_path: String,

    /// Attach the `currentEnrollment < maxStudents` precondition to seat
    /// writes so concurrent requests cannot overfill a lesson.
    #[serde(default = "default_capacity_guard")]
    pub capacity_guard: bool,
}

impl Default for EnrollmentConfig {
    fn default() -> Self {
        Self {
            default_performed_by: default_performed_by(),
            error_sink_path: default_error_sink_path(),
            capacity_guard: default_capacity_guard(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_correct() {
        let config = EnrollmentConfig::default();
        assert_eq!(config.default_performed_by, "system");
        assert_eq!(config.error_sink_path, "/system/errors");
        assert!(config.capacity_guard);
    }
}
