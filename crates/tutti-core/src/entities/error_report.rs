use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::enums::Severity;

/// A report posted to the error sink when a compensating action fails and
/// the records need an operator's attention.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ErrorReport {
    pub severity: Severity,
    pub operation: String,
    pub lesson_id: String,
    pub student_id: String,
    pub failures: Vec<String>,
    pub reported_at: DateTime<Utc>,
}
