use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::entities::{Enrollment, WaitlistEntry};
use crate::enums::{DayOfWeek, EnrollmentStatus};
use crate::errors::CoreError;
use crate::schedule::TimeSlot;

/// A scheduled, capacity-bounded group theory lesson.
///
/// The lesson document is the source of truth for who holds a seat and who
/// is queued; student documents only mirror it.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TheoryLesson {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub is_active: bool,
    pub schedule: Schedule,
    pub capacity: Capacity,
    #[serde(default)]
    pub academic_requirements: AcademicRequirements,
    #[serde(default)]
    pub enrollment: LessonEnrollment,
}

/// Weekly meeting slot. Times are wall-clock `HH:MM` in a single timezone.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Schedule {
    pub day_of_week: DayOfWeek,
    pub start_time: String,
    pub end_time: String,
}

/// Seat accounting. `max_students == None` means unbounded.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Capacity {
    #[serde(default)]
    pub max_students: Option<u32>,
    #[serde(default)]
    pub current_enrollment: u32,
    #[serde(default)]
    pub waitlist_enabled: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AcademicRequirements {
    #[serde(default)]
    pub target_grades: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
    #[serde(default)]
    pub prerequisites: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LessonEnrollment {
    #[serde(default)]
    pub enrolled_students: Vec<Enrollment>,
    #[serde(default)]
    pub waitlist: Vec<WaitlistEntry>,
}

impl TheoryLesson {
    /// Title if set, otherwise the lesson ID.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.title.as_deref().unwrap_or(&self.id)
    }

    /// Whether every seat is taken. Unbounded lessons are never full.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.capacity
            .max_students
            .is_some_and(|max| self.capacity.current_enrollment >= max)
    }

    /// The student's active seat, if any.
    #[must_use]
    pub fn active_enrollment(&self, student_id: &str) -> Option<&Enrollment> {
        self.enrollment
            .enrolled_students
            .iter()
            .find(|e| e.student_id == student_id && e.status == EnrollmentStatus::Active)
    }

    /// The student's waitlist entry, if any.
    #[must_use]
    pub fn waitlist_entry(&self, student_id: &str) -> Option<&WaitlistEntry> {
        self.enrollment
            .waitlist
            .iter()
            .find(|w| w.student_id == student_id)
    }

    /// Number of `active` entries in `enrolled_students`.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.enrollment
            .enrolled_students
            .iter()
            .filter(|e| e.status == EnrollmentStatus::Active)
            .count()
    }

    /// Position the next queued student would be given.
    #[must_use]
    pub fn next_waitlist_position(&self) -> u32 {
        u32::try_from(self.enrollment.waitlist.len())
            .unwrap_or(u32::MAX)
            .saturating_add(1)
    }

    /// Longest-waiting entry by `queued_at`. Ties keep storage order.
    #[must_use]
    pub fn next_in_waitlist(&self) -> Option<&WaitlistEntry> {
        self.enrollment.waitlist.iter().min_by_key(|w| w.queued_at)
    }

    /// 1-based FIFO rank of the student, computed from `queued_at` rather
    /// than the stored `position`.
    #[must_use]
    pub fn waitlist_rank(&self, student_id: &str) -> Option<u32> {
        let mut queue: Vec<&WaitlistEntry> = self.enrollment.waitlist.iter().collect();
        queue.sort_by_key(|w| w.queued_at);
        queue
            .iter()
            .position(|w| w.student_id == student_id)
            .and_then(|idx| u32::try_from(idx + 1).ok())
    }

    /// Parse the schedule into a comparable slot.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::Validation` if the times are malformed or the slot
    /// is empty.
    pub fn time_slot(&self) -> Result<TimeSlot, CoreError> {
        TimeSlot::from_schedule(&self.schedule)
    }
}
