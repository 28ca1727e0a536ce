//! Response types returned by the enrollment operations.
//!
//! These structs are what UI handlers (and `tutti` commands) receive, and
//! they serialize as camelCase JSON.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::entities::{Enrollment, Student, TheoryLesson};
use crate::enums::{EnrollmentOutcome, EnrollmentStatus};

/// Result of `validate_enrollment`.
///
/// `lesson` and `student` carry the documents the checks ran against so the
/// caller does not have to fetch them again.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    pub is_valid: bool,
    pub errors: Vec<String>,
    pub enrollment_status: EnrollmentOutcome,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lesson: Option<TheoryLesson>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub student: Option<Student>,
}

impl ValidationReport {
    /// A report that failed before the documents could be examined.
    #[must_use]
    pub fn rejected(error: impl Into<String>) -> Self {
        Self {
            is_valid: false,
            errors: vec![error.into()],
            enrollment_status: EnrollmentOutcome::Enrolled,
            lesson: None,
            student: None,
        }
    }
}

/// Result of `enroll_student`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EnrollResponse {
    pub success: bool,
    pub status: EnrollmentOutcome,
    /// The lesson document after the write.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lesson: Option<TheoryLesson>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enrollment: Option<Enrollment>,
    /// Queue position when the request was waitlisted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<u32>,
}

/// Result of `unenroll_student`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UnenrollResponse {
    pub success: bool,
    pub status: EnrollmentStatus,
    pub previous_status: EnrollmentStatus,
    pub processed_waitlist: bool,
}

/// Result of `add_to_waitlist`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct WaitlistPlacement {
    pub success: bool,
    pub status: EnrollmentOutcome,
    pub position: u32,
    pub queued_at: DateTime<Utc>,
}

/// Current standing of a student in a lesson, read from the lesson document.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EnrollmentLookup {
    pub lesson_id: String,
    pub student_id: String,
    pub status: EnrollmentStatus,
    /// `enrolledAt` for seats, `queuedAt` for waitlist entries.
    pub since: DateTime<Utc>,
    /// Live FIFO rank for waitlisted students.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub waitlist_rank: Option<u32>,
}

/// Outcome of a best-effort rollback. Never returned as an error.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RollbackReport {
    /// The lesson held a seat for the student and it was removed.
    pub lesson_reverted: bool,
    /// The student-side unwind ran without error.
    pub student_reverted: bool,
    /// Unexpected failures; non-empty means an operator must reconcile.
    pub failures: Vec<String>,
}

impl RollbackReport {
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}
