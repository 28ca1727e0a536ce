//! Enroll and unenroll: the lesson/student dual write.
//!
//! The lesson document is canonical. The student mirror is written second;
//! if either write fails during enrollment, the records stamped by that
//! attempt are unwound before the error is returned. A lesson write the
//! store rejected outright wrote nothing and is not unwound.

use chrono::Utc;
use serde_json::json;
use tutti_core::entities::{Enrollment, LessonMirror, MirrorAuditEntry, TheoryLesson};
use tutti_core::enums::{AuditAction, EnrollmentOutcome, EnrollmentStatus};
use tutti_core::ids::{lesson_path, student_path};
use tutti_core::responses::{EnrollResponse, EnrollmentLookup, UnenrollResponse};
use tutti_store::{ArrayFilter, PatchOptions, Precondition, RecordStore, UpdateBuilder};

use crate::error::EnrollmentError;
use crate::options::{EnrollOptions, UnenrollOptions};
use crate::service::{
    CURRENT_ENROLLMENT, ENROLLED_STUDENTS, EnrollmentService, THEORY_LESSONS, WAITLIST, decode,
    encode, ensure_transition,
};

const ENROLL_FAILED: &str = "Failed to enroll student";
const UNENROLL_FAILED: &str = "Failed to unenroll student";

impl<S: RecordStore> EnrollmentService<S> {
    /// Enroll a student, or queue them when the lesson is full and the
    /// waitlist is open.
    ///
    /// # Errors
    ///
    /// - `EnrollmentError::Validation` with every failed check; nothing is written.
    /// - `EnrollmentError::Store` ("Failed to enroll student: ...") when a
    ///   write fails. Any partial write has been rolled back by then.
    pub async fn enroll_student(
        &self,
        lesson_id: &str,
        student_id: &str,
        options: EnrollOptions,
    ) -> Result<EnrollResponse, EnrollmentError> {
        let report = self.validate_enrollment(lesson_id, student_id).await?;
        if !report.is_valid {
            tracing::warn!(lesson_id, student_id, errors = ?report.errors, "enrollment validation failed");
            return Err(EnrollmentError::Validation {
                errors: report.errors,
            });
        }

        if report.enrollment_status == EnrollmentOutcome::Waitlist {
            let placement = self.add_to_waitlist(lesson_id, student_id, options).await?;
            return Ok(EnrollResponse {
                success: true,
                status: EnrollmentOutcome::Waitlist,
                lesson: None,
                enrollment: None,
                position: Some(placement.position),
            });
        }

        let now = Utc::now();
        let actor = self.actor(options.performed_by.as_deref());
        let enrollment = Enrollment {
            student_id: student_id.to_string(),
            enrolled_at: now,
            status: EnrollmentStatus::Active,
            enrollment_method: options.method,
            performed_by: actor.clone(),
        };
        let mirror = LessonMirror::opened(
            lesson_id,
            EnrollmentStatus::Active,
            options.method,
            &actor,
            AuditAction::Enrolled,
            options.reason.clone(),
            now,
        );

        let lesson_update = UpdateBuilder::new()
            .push(ENROLLED_STUDENTS, encode(&enrollment)?)
            .inc(CURRENT_ENROLLMENT, 1)
            .build();
        let student_update = UpdateBuilder::new().push(THEORY_LESSONS, encode(&mirror)?).build();

        // A second active seat for the same student is a lost double submit.
        let seat_options = self
            .seat_options(options.transaction.clone())
            .precondition(Precondition::ArrayLacks {
                field: ENROLLED_STUDENTS.into(),
                condition: json!({"studentId": student_id, "status": "active"}),
            });
        let lesson_doc = match self
            .store()
            .patch(&lesson_path(lesson_id), &lesson_update, &seat_options)
            .await
        {
            Ok(doc) => doc,
            Err(source) if source.is_precondition_failed() || source.is_not_found() => {
                tracing::warn!(%source, lesson_id, student_id, "lesson write rejected, nothing written");
                return Err(EnrollmentError::store(ENROLL_FAILED, source));
            }
            Err(source) => {
                tracing::warn!(%source, lesson_id, student_id, "lesson write failed, rolling back");
                self.rollback_attempt(lesson_id, student_id, now).await;
                return Err(EnrollmentError::store(ENROLL_FAILED, source));
            }
        };

        if let Err(source) = self
            .store()
            .patch(
                &student_path(student_id),
                &student_update,
                &PatchOptions::new().transaction(options.transaction.clone()),
            )
            .await
        {
            tracing::warn!(%source, lesson_id, student_id, "student write failed, rolling back");
            self.rollback_attempt(lesson_id, student_id, now).await;
            return Err(EnrollmentError::store(ENROLL_FAILED, source));
        }

        let lesson: TheoryLesson = decode(&lesson_path(lesson_id), lesson_doc)?;
        tracing::info!(
            lesson_id,
            lesson = lesson.display_name(),
            student_id,
            method = %options.method,
            current_enrollment = lesson.capacity.current_enrollment,
            "student enrolled"
        );
        Ok(EnrollResponse {
            success: true,
            status: EnrollmentOutcome::Enrolled,
            lesson: Some(lesson),
            enrollment: Some(enrollment),
            position: None,
        })
    }

    /// Release a student's seat or waitlist place, then offer any freed seat
    /// to the waitlist.
    ///
    /// # Errors
    ///
    /// - `EnrollmentError::NotEnrolled` if the student holds no active or
    ///   waitlisted record in the lesson.
    /// - `EnrollmentError::Store` ("Failed to unenroll student: ...") when a
    ///   write fails. There is no compensation for unenroll.
    pub async fn unenroll_student(
        &self,
        lesson_id: &str,
        student_id: &str,
        options: UnenrollOptions,
    ) -> Result<UnenrollResponse, EnrollmentError> {
        let Some(current) = self.get_student_enrollment(lesson_id, student_id).await? else {
            tracing::warn!(lesson_id, student_id, "unenroll requested for a student with no current record");
            return Err(EnrollmentError::NotEnrolled {
                lesson_id: lesson_id.to_string(),
                student_id: student_id.to_string(),
            });
        };
        let previous_status = current.status;
        ensure_transition(lesson_id, student_id, previous_status, EnrollmentStatus::Inactive)?;
        let now = Utc::now();
        let actor = self.actor(options.performed_by.as_deref());

        let (lesson_update, lesson_options) = if previous_status == EnrollmentStatus::Active {
            (
                UpdateBuilder::new()
                    .pull(ENROLLED_STUDENTS, json!({"studentId": student_id, "status": "active"}))
                    .inc(CURRENT_ENROLLMENT, -1)
                    .build(),
                PatchOptions::new()
                    .transaction(options.transaction.clone())
                    .precondition(Precondition::ArrayContains {
                        field: ENROLLED_STUDENTS.into(),
                        key: "studentId".into(),
                        value: student_id.to_string(),
                    }),
            )
        } else {
            (
                UpdateBuilder::new()
                    .pull(WAITLIST, json!({"studentId": student_id}))
                    .build(),
                PatchOptions::new().transaction(options.transaction.clone()),
            )
        };
        self.store()
            .patch(&lesson_path(lesson_id), &lesson_update, &lesson_options)
            .await
            .map_err(|source| {
                tracing::warn!(%source, lesson_id, student_id, "lesson write failed during unenroll");
                EnrollmentError::store(UNENROLL_FAILED, source)
            })?;

        let audit = MirrorAuditEntry {
            action: AuditAction::Unenrolled,
            performed_at: now,
            performed_by: actor,
            reason: options.reason.clone(),
        };
        let student_update = UpdateBuilder::new()
            .set(
                format!("{THEORY_LESSONS}.$[elem].status"),
                json!(EnrollmentStatus::Inactive.as_str()),
            )
            .set(format!("{THEORY_LESSONS}.$[elem].unenrolledAt"), encode(&now)?)
            .push(format!("{THEORY_LESSONS}.$[elem].auditTrail"), encode(&audit)?)
            .build();
        let student_options = PatchOptions::new()
            .transaction(options.transaction.clone())
            .array_filter(
                ArrayFilter::new("elem")
                    .field_eq("lessonId", lesson_id)
                    .field_eq("status", previous_status.as_str()),
            );
        self.store()
            .patch(&student_path(student_id), &student_update, &student_options)
            .await
            .map_err(|source| {
                tracing::warn!(%source, lesson_id, student_id, "student write failed during unenroll");
                EnrollmentError::store(UNENROLL_FAILED, source)
            })?;

        tracing::info!(lesson_id, student_id, %previous_status, "student unenrolled");

        // The release has landed; a promotion failure must not undo it.
        let processed_waitlist = match self.process_waitlist(lesson_id).await {
            Ok(promoted) => promoted,
            Err(error) => {
                tracing::warn!(%error, lesson_id, "waitlist promotion failed after unenroll");
                false
            }
        };
        Ok(UnenrollResponse {
            success: true,
            status: EnrollmentStatus::Inactive,
            previous_status,
            processed_waitlist,
        })
    }

    /// The student's current record in the lesson, read from the lesson
    /// document. `None` when the lesson does not exist or holds no active
    /// seat or waitlist entry for the student.
    ///
    /// # Errors
    ///
    /// Returns `EnrollmentError` if the lesson cannot be read or decoded.
    pub async fn get_student_enrollment(
        &self,
        lesson_id: &str,
        student_id: &str,
    ) -> Result<Option<EnrollmentLookup>, EnrollmentError> {
        let Some(lesson) = self.find_lesson(lesson_id).await? else {
            return Ok(None);
        };
        if let Some(seat) = lesson.active_enrollment(student_id) {
            return Ok(Some(EnrollmentLookup {
                lesson_id: lesson_id.to_string(),
                student_id: student_id.to_string(),
                status: EnrollmentStatus::Active,
                since: seat.enrolled_at,
                waitlist_rank: None,
            }));
        }
        Ok(lesson.waitlist_entry(student_id).map(|entry| EnrollmentLookup {
            lesson_id: lesson_id.to_string(),
            student_id: student_id.to_string(),
            status: EnrollmentStatus::Waitlist,
            since: entry.queued_at,
            waitlist_rank: lesson.waitlist_rank(student_id),
        }))
    }
}
