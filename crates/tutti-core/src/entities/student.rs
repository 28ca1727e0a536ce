use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::entities::MirrorAuditEntry;
use crate::enums::{AuditAction, EnrollmentMethod, EnrollmentStatus};

/// A conservatory student. Only the fields the enrollment workflow reads or
/// writes are modelled.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    pub is_active: bool,
    #[serde(default)]
    pub academic_info: AcademicInfo,
    #[serde(default)]
    pub enrollments: StudentEnrollments,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AcademicInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theory_level: Option<String>,
    #[serde(default)]
    pub completed_courses: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StudentEnrollments {
    #[serde(default)]
    pub theory_lessons: Vec<LessonMirror>,
}

/// Denormalized copy of a lesson enrollment kept on the student document.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LessonMirror {
    pub lesson_id: String,
    pub enrolled_at: DateTime<Utc>,
    pub status: EnrollmentStatus,
    #[serde(default)]
    pub enrollment_method: EnrollmentMethod,
    pub performed_by: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unenrolled_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub performance: Performance,
    #[serde(default)]
    pub audit_trail: Vec<MirrorAuditEntry>,
}

/// Per-lesson progress metrics. Fresh mirrors start zeroed.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Performance {
    #[serde(default)]
    pub attendance_rate: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_attended: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grade: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl Student {
    /// Mirrors of lessons the student currently holds a seat in.
    pub fn active_lessons(&self) -> impl Iterator<Item = &LessonMirror> {
        self.enrollments
            .theory_lessons
            .iter()
            .filter(|m| m.status == EnrollmentStatus::Active)
    }

    /// The mirror for `lesson_id` in the given status, if present.
    #[must_use]
    pub fn mirror(&self, lesson_id: &str, status: EnrollmentStatus) -> Option<&LessonMirror> {
        self.enrollments
            .theory_lessons
            .iter()
            .find(|m| m.lesson_id == lesson_id && m.status == status)
    }
}

impl LessonMirror {
    /// A fresh mirror whose audit trail opens with `action`.
    #[must_use]
    pub fn opened(
        lesson_id: &str,
        status: EnrollmentStatus,
        method: EnrollmentMethod,
        performed_by: &str,
        action: AuditAction,
        reason: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            lesson_id: lesson_id.to_string(),
            enrolled_at: now,
            status,
            enrollment_method: method,
            performed_by: performed_by.to_string(),
            unenrolled_at: None,
            performance: Performance::default(),
            audit_trail: vec![MirrorAuditEntry {
                action,
                performed_at: now,
                performed_by: performed_by.to_string(),
                reason,
            }],
        }
    }
}
