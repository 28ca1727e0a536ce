use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::enums::{EnrollmentMethod, EnrollmentStatus};

/// A student's seat in a theory lesson, stored on the lesson document.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Enrollment {
    pub student_id: String,
    pub enrolled_at: DateTime<Utc>,
    pub status: EnrollmentStatus,
    #[serde(default)]
    pub enrollment_method: EnrollmentMethod,
    pub performed_by: String,
}

/// A queued request for a seat in a full lesson.
///
/// `position` is assigned once at insertion and never renumbered; use
/// [`crate::entities::TheoryLesson::waitlist_rank`] for the live position.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct WaitlistEntry {
    pub student_id: String,
    pub queued_at: DateTime<Utc>,
    pub position: u32,
}
