//! Enrollment eligibility checks.
//!
//! Existence and activity of the lesson and student abort validation; every
//! later check runs and contributes its own error, so the caller sees all
//! reasons at once.

use tutti_core::entities::{Student, TheoryLesson};
use tutti_core::enums::{EnrollmentOutcome, EnrollmentStatus};
use tutti_core::responses::ValidationReport;
use tutti_core::schedule::TimeSlot;
use tutti_store::RecordStore;

use crate::error::EnrollmentError;
use crate::service::EnrollmentService;

/// Lesson level that admits every theory level.
const ANY_LEVEL: &str = "all";

impl<S: RecordStore> EnrollmentService<S> {
    /// Check whether `student_id` may enroll in `lesson_id`.
    ///
    /// Only reads; a report with `is_valid == false` is a normal result.
    ///
    /// # Errors
    ///
    /// Returns `EnrollmentError` if a store read fails for a reason other
    /// than a missing document, or a document cannot be decoded.
    pub async fn validate_enrollment(
        &self,
        lesson_id: &str,
        student_id: &str,
    ) -> Result<ValidationReport, EnrollmentError> {
        let Some(lesson) = self.find_lesson(lesson_id).await? else {
            return Ok(ValidationReport::rejected("Theory lesson not found"));
        };
        if !lesson.is_active {
            return Ok(ValidationReport {
                lesson: Some(lesson),
                ..ValidationReport::rejected("Theory lesson is not active")
            });
        }

        let Some(student) = self.find_student(student_id).await? else {
            return Ok(ValidationReport {
                lesson: Some(lesson),
                ..ValidationReport::rejected("Student not found")
            });
        };
        if !student.is_active {
            return Ok(ValidationReport {
                lesson: Some(lesson),
                student: Some(student),
                ..ValidationReport::rejected("Student is not active")
            });
        }

        let mut errors = Vec::new();
        let mut enrollment_status = EnrollmentOutcome::Enrolled;

        if let Some(status) = current_status(&lesson, &student) {
            errors.push(format!("Student is already {status} in this theory lesson"));
        }

        if lesson.is_full() {
            if lesson.capacity.waitlist_enabled {
                enrollment_status = EnrollmentOutcome::Waitlist;
            } else {
                errors.push("Theory lesson is full and waitlist is disabled".to_string());
            }
        }

        errors.extend(requirement_errors(&lesson, &student));
        errors.extend(self.schedule_conflicts(&lesson, &student).await?);

        let is_valid = errors.is_empty();
        if !is_valid {
            tracing::debug!(lesson_id, student_id, ?errors, "enrollment rejected");
        }
        Ok(ValidationReport {
            is_valid,
            errors,
            enrollment_status,
            lesson: Some(lesson),
            student: Some(student),
        })
    }

    async fn schedule_conflicts(
        &self,
        lesson: &TheoryLesson,
        student: &Student,
    ) -> Result<Vec<String>, EnrollmentError> {
        let slot = match lesson.time_slot() {
            Ok(slot) => slot,
            Err(error) => return Ok(vec![error.to_string()]),
        };

        let others: Vec<&str> = student
            .active_lessons()
            .map(|m| m.lesson_id.as_str())
            .filter(|id| *id != lesson.id)
            .collect();

        let mut conflicts = Vec::new();
        for other_id in others {
            let Some(other) = self.find_lesson(other_id).await? else {
                tracing::warn!(
                    lesson_id = other_id,
                    student_id = %student.id,
                    "active mirror points at a missing theory lesson, skipping conflict check"
                );
                continue;
            };
            let other_slot = match TimeSlot::from_schedule(&other.schedule) {
                Ok(other_slot) => other_slot,
                Err(error) => {
                    tracing::warn!(%error, lesson_id = %other.id, "unreadable schedule, skipping conflict check");
                    continue;
                }
            };
            if slot.overlaps(&other_slot) {
                conflicts.push(format!(
                    "Schedule conflict with theory lesson {} ({other_slot})",
                    other.id
                ));
            }
        }
        Ok(conflicts)
    }
}

/// Status of an existing current record for the pair. The lesson document
/// is checked first; the student mirror catches records the lesson lost.
fn current_status(lesson: &TheoryLesson, student: &Student) -> Option<EnrollmentStatus> {
    if lesson.active_enrollment(&student.id).is_some() {
        return Some(EnrollmentStatus::Active);
    }
    if lesson.waitlist_entry(&student.id).is_some() {
        return Some(EnrollmentStatus::Waitlist);
    }
    student
        .enrollments
        .theory_lessons
        .iter()
        .find(|m| m.lesson_id == lesson.id && m.status.is_current())
        .map(|m| m.status)
}

fn requirement_errors(lesson: &TheoryLesson, student: &Student) -> Vec<String> {
    let requirements = &lesson.academic_requirements;
    let info = &student.academic_info;
    let mut errors = Vec::new();

    if !requirements.target_grades.is_empty() {
        let eligible = info
            .class
            .as_ref()
            .is_some_and(|class| requirements.target_grades.contains(class));
        if !eligible {
            errors.push(format!(
                "Student grade {} is not among the target grades ({})",
                info.class.as_deref().unwrap_or("(unset)"),
                requirements.target_grades.join(", ")
            ));
        }
    }

    if let Some(level) = requirements
        .level
        .as_deref()
        .filter(|level| !level.is_empty() && !level.eq_ignore_ascii_case(ANY_LEVEL))
    {
        if info.theory_level.as_deref() != Some(level) {
            errors.push(format!(
                "Student theory level {} does not match required level {level}",
                info.theory_level.as_deref().unwrap_or("(unset)")
            ));
        }
    }

    for prerequisite in &requirements.prerequisites {
        if !info.completed_courses.contains(prerequisite) {
            errors.push(format!("Missing prerequisite: {prerequisite}"));
        }
    }

    errors
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use pretty_assertions::assert_eq;
    use tutti_core::entities::{
        AcademicInfo, AcademicRequirements, Capacity, LessonEnrollment, Schedule,
        StudentEnrollments,
    };
    use tutti_core::enums::DayOfWeek;

    use super::*;

    fn lesson(requirements: AcademicRequirements) -> TheoryLesson {
        TheoryLesson {
            id: "thr-01".into(),
            title: None,
            is_active: true,
            schedule: Schedule {
                day_of_week: DayOfWeek::Monday,
                start_time: "10:00".into(),
                end_time: "11:00".into(),
            },
            capacity: Capacity {
                max_students: Some(10),
                current_enrollment: 0,
                waitlist_enabled: true,
            },
            academic_requirements: requirements,
            enrollment: LessonEnrollment::default(),
        }
    }

    fn student(class: Option<&str>, level: Option<&str>, completed: &[&str]) -> Student {
        Student {
            id: "stu-01".into(),
            full_name: None,
            is_active: true,
            academic_info: AcademicInfo {
                class: class.map(String::from),
                theory_level: level.map(String::from),
                completed_courses: completed.iter().map(|c| (*c).to_string()).collect(),
            },
            enrollments: StudentEnrollments::default(),
        }
    }

    #[test]
    fn no_requirements_means_no_errors() {
        let errors = requirement_errors(
            &lesson(AcademicRequirements::default()),
            &student(None, None, &[]),
        );
        assert!(errors.is_empty());
    }

    #[test]
    fn each_failed_requirement_adds_one_error() {
        let requirements = AcademicRequirements {
            target_grades: vec!["ט".into(), "י".into()],
            level: Some("advanced".into()),
            prerequisites: vec!["solfege-1".into(), "harmony-1".into()],
        };
        let errors = requirement_errors(
            &lesson(requirements),
            &student(Some("ח"), Some("beginner"), &["solfege-1"]),
        );
        assert_eq!(
            errors,
            vec![
                "Student grade ח is not among the target grades (ט, י)".to_string(),
                "Student theory level beginner does not match required level advanced".to_string(),
                "Missing prerequisite: harmony-1".to_string(),
            ]
        );
    }

    #[test]
    fn level_all_admits_everyone() {
        let requirements = AcademicRequirements {
            level: Some("all".into()),
            ..AcademicRequirements::default()
        };
        assert!(requirement_errors(&lesson(requirements), &student(None, None, &[])).is_empty());
    }

    #[test]
    fn waitlist_mirror_counts_as_current() {
        let mut s = student(None, None, &[]);
        s.enrollments.theory_lessons.push(tutti_core::entities::LessonMirror::opened(
            "thr-01",
            EnrollmentStatus::Waitlist,
            tutti_core::enums::EnrollmentMethod::Manual,
            "system",
            tutti_core::enums::AuditAction::Waitlisted,
            None,
            Utc::now(),
        ));
        let l = lesson(AcademicRequirements::default());
        assert_eq!(current_status(&l, &s), Some(EnrollmentStatus::Waitlist));
    }
}
