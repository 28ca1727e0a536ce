//! Best-effort undo of a failed enrollment.
//!
//! Both halves are delete-if-present: the lesson side only runs when the
//! lesson still lists a matching seat, the student side pulls a matching
//! active mirror if there is one. Replaying a rollback is always safe.

use chrono::{DateTime, Utc};
use serde_json::{Value, json};
use tutti_core::ids::{lesson_path, student_path};
use tutti_core::responses::RollbackReport;
use tutti_store::{PatchOptions, Precondition, RecordStore, StoreError, UpdateBuilder};

use crate::service::{CURRENT_ENROLLMENT, ENROLLED_STUDENTS, EnrollmentService, THEORY_LESSONS};

const ROLLBACK_OPERATION: &str = "enrollment_rollback";

impl<S: RecordStore> EnrollmentService<S> {
    /// Remove any seat and active mirror a failed `enroll_student` left
    /// behind.
    ///
    /// Never fails. Unexpected store errors are collected in the report and
    /// sent to the error sink as a critical report.
    pub async fn rollback_enrollment(&self, lesson_id: &str, student_id: &str) -> RollbackReport {
        self.unwind(
            lesson_id,
            student_id,
            json!({"studentId": student_id, "status": "active"}),
            json!({"lessonId": lesson_id, "status": "active"}),
        )
        .await
    }

    /// Undo only the records written by the enrollment attempt stamped
    /// `enrolled_at`. A seat or mirror another request wrote for the same
    /// pair is left alone.
    pub(crate) async fn rollback_attempt(
        &self,
        lesson_id: &str,
        student_id: &str,
        enrolled_at: DateTime<Utc>,
    ) -> RollbackReport {
        let stamp = match serde_json::to_value(enrolled_at) {
            Ok(stamp) => stamp,
            Err(error) => {
                let mut report = RollbackReport::default();
                report.failures.push(format!("encode enrolledAt: {error}"));
                self.report_critical(
                    ROLLBACK_OPERATION,
                    lesson_id,
                    student_id,
                    report.failures.clone(),
                    Utc::now(),
                )
                .await;
                return report;
            }
        };
        self.unwind(
            lesson_id,
            student_id,
            json!({"studentId": student_id, "status": "active", "enrolledAt": stamp}),
            json!({"lessonId": lesson_id, "status": "active", "enrolledAt": stamp}),
        )
        .await
    }

    async fn unwind(
        &self,
        lesson_id: &str,
        student_id: &str,
        seat: Value,
        mirror: Value,
    ) -> RollbackReport {
        let mut report = RollbackReport::default();

        let lesson_undo = UpdateBuilder::new()
            .pull(ENROLLED_STUDENTS, seat.clone())
            .inc(CURRENT_ENROLLMENT, -1)
            .build();
        let only_if_listed = PatchOptions::new().precondition(Precondition::ArrayMatches {
            field: ENROLLED_STUDENTS.into(),
            condition: seat,
        });
        match self
            .store()
            .patch(&lesson_path(lesson_id), &lesson_undo, &only_if_listed)
            .await
        {
            Ok(_) => report.lesson_reverted = true,
            Err(error) if nothing_to_undo(&error) => {
                tracing::debug!(%error, lesson_id, student_id, "rollback: no seat to remove");
            }
            Err(error) => {
                tracing::warn!(%error, lesson_id, student_id, "rollback: lesson unwind failed");
                report.failures.push(format!("lesson: {error}"));
            }
        }

        let student_undo = UpdateBuilder::new().pull(THEORY_LESSONS, mirror).build();
        match self
            .store()
            .patch(&student_path(student_id), &student_undo, &PatchOptions::new())
            .await
        {
            Ok(_) => report.student_reverted = true,
            Err(error) if nothing_to_undo(&error) => {
                tracing::debug!(%error, lesson_id, student_id, "rollback: no student document");
                report.student_reverted = true;
            }
            Err(error) => {
                tracing::warn!(%error, lesson_id, student_id, "rollback: student unwind failed");
                report.failures.push(format!("student: {error}"));
            }
        }

        if !report.is_clean() {
            self.report_critical(
                ROLLBACK_OPERATION,
                lesson_id,
                student_id,
                report.failures.clone(),
                Utc::now(),
            )
            .await;
        }
        report
    }
}

fn nothing_to_undo(error: &StoreError) -> bool {
    error.is_not_found() || error.is_precondition_failed()
}
