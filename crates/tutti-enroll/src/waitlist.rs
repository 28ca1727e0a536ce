//! Waitlist placement and promotion.
//!
//! Entries are served in `queuedAt` order. The stored `position` is the
//! queue length at insertion and goes stale as entries leave, so ranks are
//! always computed on read.

use chrono::{DateTime, Utc};
use serde_json::json;
use tutti_core::entities::{
    Enrollment, LessonMirror, MirrorAuditEntry, Student, TheoryLesson, WaitlistEntry,
};
use tutti_core::enums::{AuditAction, EnrollmentMethod, EnrollmentOutcome, EnrollmentStatus};
use tutti_core::errors::CoreError;
use tutti_core::ids::{lesson_path, student_path};
use tutti_core::responses::{EnrollResponse, WaitlistPlacement};
use tutti_store::{ArrayFilter, PatchOptions, Precondition, RecordStore, UpdateBuilder};

use crate::error::EnrollmentError;
use crate::options::EnrollOptions;
use crate::service::{
    CURRENT_ENROLLMENT, ENROLLED_STUDENTS, EnrollmentService, THEORY_LESSONS, WAITLIST, decode,
    encode, ensure_transition,
};

const PROMOTION_ACTOR: &str = "system";
const PROMOTION_REASON: &str = "Space became available";

const WAITLIST_FAILED: &str = "Failed to add student to waitlist";
const PROMOTION_FAILED: &str = "Failed to promote student from waitlist";

impl<S: RecordStore> EnrollmentService<S> {
    /// Queue a student for a seat in `lesson_id`.
    ///
    /// Appends a waitlist entry to the lesson and a `waitlist` mirror to the
    /// student. `currentEnrollment` is not touched.
    ///
    /// # Errors
    ///
    /// - `EnrollmentError::Validation` if the lesson's waitlist is disabled
    ///   or the student already holds a current record there.
    /// - `EnrollmentError::Store` if either write fails. A failed mirror
    ///   write pulls the waitlist entry again before returning.
    pub async fn add_to_waitlist(
        &self,
        lesson_id: &str,
        student_id: &str,
        options: EnrollOptions,
    ) -> Result<WaitlistPlacement, EnrollmentError> {
        let lesson = self.load_lesson(lesson_id).await?;
        if !lesson.capacity.waitlist_enabled {
            return Err(EnrollmentError::Validation {
                errors: vec!["Waitlist is disabled for this theory lesson".to_string()],
            });
        }
        let existing = if lesson.active_enrollment(student_id).is_some() {
            Some(EnrollmentStatus::Active)
        } else if lesson.waitlist_entry(student_id).is_some() {
            Some(EnrollmentStatus::Waitlist)
        } else {
            None
        };
        if let Some(status) = existing {
            return Err(EnrollmentError::Validation {
                errors: vec![format!("Student is already {status} in this theory lesson")],
            });
        }

        let now = Utc::now();
        let actor = self.actor(options.performed_by.as_deref());
        let position = lesson.next_waitlist_position();
        let entry = WaitlistEntry {
            student_id: student_id.to_string(),
            queued_at: now,
            position,
        };
        let mirror = LessonMirror::opened(
            lesson_id,
            EnrollmentStatus::Waitlist,
            options.method,
            &actor,
            AuditAction::Waitlisted,
            options.reason.clone(),
            now,
        );
        let patch_options = PatchOptions::new().transaction(options.transaction.clone());

        self.store()
            .patch(
                &lesson_path(lesson_id),
                &UpdateBuilder::new().push(WAITLIST, encode(&entry)?).build(),
                &patch_options,
            )
            .await
            .map_err(|source| EnrollmentError::store(WAITLIST_FAILED, source))?;

        if let Err(source) = self
            .store()
            .patch(
                &student_path(student_id),
                &UpdateBuilder::new().push(THEORY_LESSONS, encode(&mirror)?).build(),
                &patch_options,
            )
            .await
        {
            tracing::warn!(%source, lesson_id, student_id, "waitlist mirror write failed, pulling entry");
            let undo = UpdateBuilder::new()
                .pull(WAITLIST, json!({"studentId": student_id}))
                .build();
            if let Err(error) = self
                .store()
                .patch(&lesson_path(lesson_id), &undo, &patch_options)
                .await
            {
                self.report_critical(
                    "waitlist_add_compensation",
                    lesson_id,
                    student_id,
                    vec![format!("lesson: {error}")],
                    now,
                )
                .await;
            }
            return Err(EnrollmentError::store(WAITLIST_FAILED, source));
        }

        tracing::info!(lesson_id, student_id, position, "student added to waitlist");
        Ok(WaitlistPlacement {
            success: true,
            status: EnrollmentOutcome::Waitlist,
            position,
            queued_at: now,
        })
    }

    /// Position the next queued student would be given (`len + 1`).
    ///
    /// # Errors
    ///
    /// Returns `EnrollmentError` if the lesson is missing or unreadable.
    pub async fn get_next_waitlist_position(&self, lesson_id: &str) -> Result<u32, EnrollmentError> {
        Ok(self.load_lesson(lesson_id).await?.next_waitlist_position())
    }

    /// Live 1-based rank of the student in the waitlist, by `queuedAt`.
    ///
    /// # Errors
    ///
    /// Returns `EnrollmentError` if the lesson is missing or unreadable.
    pub async fn waitlist_position(
        &self,
        lesson_id: &str,
        student_id: &str,
    ) -> Result<Option<u32>, EnrollmentError> {
        Ok(self.load_lesson(lesson_id).await?.waitlist_rank(student_id))
    }

    /// Promote the longest-waiting student if a seat is free.
    ///
    /// Entries that cannot be promoted (the student document is gone, or the
    /// student already holds the seat) are skipped with a warning so the
    /// next student in line still gets the seat. Returns `false` when no one
    /// was promoted: the waitlist is empty, the lesson is full, every entry
    /// was skipped, or a concurrent writer took the seat first.
    ///
    /// # Errors
    ///
    /// Returns `EnrollmentError` if the lesson cannot be read or a
    /// promotion write fails for a reason other than a lost race.
    pub async fn process_waitlist(&self, lesson_id: &str) -> Result<bool, EnrollmentError> {
        let lesson = self.load_lesson(lesson_id).await?;
        if lesson.enrollment.waitlist.is_empty() {
            return Ok(false);
        }
        if lesson.is_full() {
            tracing::debug!(lesson_id, "lesson still full, waitlist left as is");
            return Ok(false);
        }

        let mut queue: Vec<&WaitlistEntry> = lesson.enrollment.waitlist.iter().collect();
        queue.sort_by_key(|entry| entry.queued_at);
        for entry in queue {
            match self.enroll_from_waitlist(lesson_id, &entry.student_id).await {
                Ok(_) => return Ok(true),
                Err(error) if error.is_precondition_failed() => {
                    tracing::debug!(%error, lesson_id, "waitlist promotion lost a race");
                    return Ok(false);
                }
                Err(error) if cannot_be_promoted(&error) => {
                    tracing::warn!(
                        %error,
                        lesson_id,
                        student_id = %entry.student_id,
                        "skipping waitlist entry that cannot be promoted"
                    );
                }
                Err(error) => return Err(error),
            }
        }
        Ok(false)
    }

    /// Move a waitlisted student into an active seat.
    ///
    /// The lesson patch (pull the entry, push the seat, increment the count)
    /// is a single atomic write guarded by the entry's presence, the absence
    /// of an active seat for the student and, when enabled, the capacity
    /// guard. The student's `waitlist` mirror is then flipped to `active`;
    /// students queued before mirrors were written get a fresh active mirror
    /// instead.
    ///
    /// # Errors
    ///
    /// - `EnrollmentError::NotEnrolled` if the student is not on the waitlist.
    /// - `EnrollmentError::Core` (`NotFound`) if the student document is
    ///   missing, or (`InvalidTransition`) if the student already holds an
    ///   active seat or mirror in the lesson. Nothing is written.
    /// - `EnrollmentError::Store` if a write fails. A failed student write
    ///   restores the lesson, original `queuedAt` included.
    pub async fn enroll_from_waitlist(
        &self,
        lesson_id: &str,
        student_id: &str,
    ) -> Result<EnrollResponse, EnrollmentError> {
        let lesson = self.load_lesson(lesson_id).await?;
        let Some(entry) = lesson.waitlist_entry(student_id).cloned() else {
            return Err(EnrollmentError::NotEnrolled {
                lesson_id: lesson_id.to_string(),
                student_id: student_id.to_string(),
            });
        };
        let student = self.load_student(student_id).await?;
        let held = if lesson.active_enrollment(student_id).is_some()
            || student.mirror(lesson_id, EnrollmentStatus::Active).is_some()
        {
            EnrollmentStatus::Active
        } else {
            EnrollmentStatus::Waitlist
        };
        ensure_transition(lesson_id, student_id, held, EnrollmentStatus::Active)?;

        let now = Utc::now();
        let enrollment = Enrollment {
            student_id: student_id.to_string(),
            enrolled_at: now,
            status: EnrollmentStatus::Active,
            enrollment_method: EnrollmentMethod::WaitlistPromotion,
            performed_by: PROMOTION_ACTOR.to_string(),
        };
        let promote = UpdateBuilder::new()
            .pull(WAITLIST, json!({"studentId": student_id}))
            .push(ENROLLED_STUDENTS, encode(&enrollment)?)
            .inc(CURRENT_ENROLLMENT, 1)
            .build();
        let guard = self
            .seat_options(None)
            .precondition(Precondition::ArrayContains {
                field: WAITLIST.into(),
                key: "studentId".into(),
                value: student_id.to_string(),
            })
            .precondition(Precondition::ArrayLacks {
                field: ENROLLED_STUDENTS.into(),
                condition: json!({"studentId": student_id, "status": "active"}),
            });
        let lesson_doc = self
            .store()
            .patch(&lesson_path(lesson_id), &promote, &guard)
            .await
            .map_err(|source| EnrollmentError::store(PROMOTION_FAILED, source))?;

        if let Err(error) = self.promote_mirror(lesson_id, &student, now).await {
            tracing::warn!(%error, lesson_id, student_id, "student write failed, restoring waitlist entry");
            self.restore_waitlist_entry(lesson_id, &entry, now).await;
            return Err(error);
        }

        let lesson: TheoryLesson = decode(&lesson_path(lesson_id), lesson_doc)?;
        tracing::info!(
            lesson_id,
            lesson = lesson.display_name(),
            student_id,
            current_enrollment = lesson.capacity.current_enrollment,
            "student promoted from waitlist"
        );
        Ok(EnrollResponse {
            success: true,
            status: EnrollmentOutcome::Enrolled,
            lesson: Some(lesson),
            enrollment: Some(enrollment),
            position: None,
        })
    }

    async fn promote_mirror(
        &self,
        lesson_id: &str,
        student: &Student,
        now: DateTime<Utc>,
    ) -> Result<(), EnrollmentError> {
        let (update, options) = if student.mirror(lesson_id, EnrollmentStatus::Waitlist).is_some() {
            let audit = MirrorAuditEntry {
                action: AuditAction::PromotedFromWaitlist,
                performed_at: now,
                performed_by: PROMOTION_ACTOR.to_string(),
                reason: Some(PROMOTION_REASON.to_string()),
            };
            (
                UpdateBuilder::new()
                    .set(
                        format!("{THEORY_LESSONS}.$[elem].status"),
                        json!(EnrollmentStatus::Active.as_str()),
                    )
                    .set(
                        format!("{THEORY_LESSONS}.$[elem].enrollmentMethod"),
                        json!(EnrollmentMethod::WaitlistPromotion.as_str()),
                    )
                    .set(format!("{THEORY_LESSONS}.$[elem].enrolledAt"), encode(&now)?)
                    .push(format!("{THEORY_LESSONS}.$[elem].auditTrail"), encode(&audit)?)
                    .build(),
                PatchOptions::new().array_filter(
                    ArrayFilter::new("elem")
                        .field_eq("lessonId", lesson_id)
                        .field_eq("status", EnrollmentStatus::Waitlist.as_str()),
                ),
            )
        } else {
            let mirror = LessonMirror::opened(
                lesson_id,
                EnrollmentStatus::Active,
                EnrollmentMethod::WaitlistPromotion,
                PROMOTION_ACTOR,
                AuditAction::PromotedFromWaitlist,
                Some(PROMOTION_REASON.to_string()),
                now,
            );
            (
                UpdateBuilder::new().push(THEORY_LESSONS, encode(&mirror)?).build(),
                PatchOptions::new(),
            )
        };

        self.store()
            .patch(&student_path(&student.id), &update, &options)
            .await
            .map_err(|source| EnrollmentError::store(PROMOTION_FAILED, source))?;
        Ok(())
    }

    /// Undo a promotion's lesson write: drop the seat stamped `enrolled_at`
    /// and put the original waitlist entry back.
    async fn restore_waitlist_entry(
        &self,
        lesson_id: &str,
        entry: &WaitlistEntry,
        enrolled_at: DateTime<Utc>,
    ) {
        let now = Utc::now();
        let parts = encode(entry).and_then(|value| encode(&enrolled_at).map(|stamp| (value, stamp)));
        let (value, stamp) = match parts {
            Ok(parts) => parts,
            Err(error) => {
                self.report_critical(
                    "waitlist_promotion_compensation",
                    lesson_id,
                    &entry.student_id,
                    vec![error.to_string()],
                    now,
                )
                .await;
                return;
            }
        };
        let seat = json!({"studentId": entry.student_id, "status": "active", "enrolledAt": stamp});
        let restore = UpdateBuilder::new()
            .pull(ENROLLED_STUDENTS, seat.clone())
            .inc(CURRENT_ENROLLMENT, -1)
            .push(WAITLIST, value)
            .build();
        let options = PatchOptions::new().precondition(Precondition::ArrayMatches {
            field: ENROLLED_STUDENTS.into(),
            condition: seat,
        });
        if let Err(error) = self
            .store()
            .patch(&lesson_path(lesson_id), &restore, &options)
            .await
        {
            self.report_critical(
                "waitlist_promotion_compensation",
                lesson_id,
                &entry.student_id,
                vec![format!("lesson: {error}")],
                now,
            )
            .await;
        }
    }
}

/// Errors raised before any write that mean this entry will never promote
/// as it stands.
const fn cannot_be_promoted(error: &EnrollmentError) -> bool {
    matches!(
        error,
        EnrollmentError::NotEnrolled { .. }
            | EnrollmentError::Core(CoreError::NotFound { .. } | CoreError::InvalidTransition { .. })
    )
}
