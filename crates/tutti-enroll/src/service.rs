//! The enrollment service and its document helpers.
//!
//! `EnrollmentService` wraps a `RecordStore` and an `EnrollmentConfig`. The
//! operations themselves live in `impl EnrollmentService` blocks spread over
//! the `validator`, `coordinator`, `waitlist`, and `rollback` modules.

use chrono::{DateTime, Utc};
use serde_json::Value;
use tutti_config::EnrollmentConfig;
use tutti_core::entities::{ErrorReport, Student, TheoryLesson};
use tutti_core::enums::{EnrollmentStatus, Severity};
use tutti_core::errors::CoreError;
use tutti_core::ids::{lesson_path, student_path};
use tutti_store::{PatchOptions, Precondition, RecordStore, StoreError, TransactionHandle};

use crate::error::EnrollmentError;

// Field paths inside stored documents.
pub(crate) const ENROLLED_STUDENTS: &str = "enrollment.enrolledStudents";
pub(crate) const WAITLIST: &str = "enrollment.waitlist";
pub(crate) const CURRENT_ENROLLMENT: &str = "capacity.currentEnrollment";
pub(crate) const MAX_STUDENTS: &str = "capacity.maxStudents";
pub(crate) const THEORY_LESSONS: &str = "enrollments.theoryLessons";

/// Coordinates enrollment state across lesson and student documents.
pub struct EnrollmentService<S> {
    store: S,
    config: EnrollmentConfig,
}

impl<S: RecordStore> EnrollmentService<S> {
    #[must_use]
    pub const fn new(store: S, config: EnrollmentConfig) -> Self {
        Self { store, config }
    }

    /// Access the underlying record store.
    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }

    #[must_use]
    pub const fn config(&self) -> &EnrollmentConfig {
        &self.config
    }

    pub(crate) fn actor(&self, requested: Option<&str>) -> String {
        requested.map_or_else(|| self.config.default_performed_by.clone(), str::to_string)
    }

    /// Patch options for a write that takes a seat.
    pub(crate) fn seat_options(&self, transaction: Option<TransactionHandle>) -> PatchOptions {
        let options = PatchOptions::new().transaction(transaction);
        if self.config.capacity_guard {
            options.precondition(Precondition::Below {
                field: CURRENT_ENROLLMENT.into(),
                limit_field: MAX_STUDENTS.into(),
            })
        } else {
            options
        }
    }

    /// Fetch a lesson, mapping a missing document to `None`.
    pub(crate) async fn find_lesson(
        &self,
        lesson_id: &str,
    ) -> Result<Option<TheoryLesson>, EnrollmentError> {
        self.find(&lesson_path(lesson_id), "theory lesson").await
    }

    /// Fetch a student, mapping a missing document to `None`.
    pub(crate) async fn find_student(
        &self,
        student_id: &str,
    ) -> Result<Option<Student>, EnrollmentError> {
        self.find(&student_path(student_id), "student").await
    }

    pub(crate) async fn load_lesson(&self, lesson_id: &str) -> Result<TheoryLesson, EnrollmentError> {
        self.find_lesson(lesson_id)
            .await?
            .ok_or_else(|| not_found("theory lesson", lesson_id))
    }

    pub(crate) async fn load_student(&self, student_id: &str) -> Result<Student, EnrollmentError> {
        self.find_student(student_id)
            .await?
            .ok_or_else(|| not_found("student", student_id))
    }

    async fn find<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        kind: &str,
    ) -> Result<Option<T>, EnrollmentError> {
        match self.store.get(path).await {
            Ok(doc) => decode(path, doc).map(Some),
            Err(StoreError::NotFound { .. }) => Ok(None),
            Err(source) => {
                tracing::warn!(%source, path, "failed to load {kind}");
                Err(EnrollmentError::store(format!("Failed to load {kind}"), source))
            }
        }
    }

    /// Log a state that needs an operator and post it to the error sink.
    ///
    /// Posting is fire-and-forget: a failure here is only logged.
    pub(crate) async fn report_critical(
        &self,
        operation: &str,
        lesson_id: &str,
        student_id: &str,
        failures: Vec<String>,
        now: DateTime<Utc>,
    ) {
        tracing::error!(
            severity = "critical",
            operation,
            lesson_id,
            student_id,
            failures = ?failures,
            "records left inconsistent, manual reconciliation required"
        );
        let report = ErrorReport {
            severity: Severity::Critical,
            operation: operation.to_string(),
            lesson_id: lesson_id.to_string(),
            student_id: student_id.to_string(),
            failures,
            reported_at: now,
        };
        let body = match serde_json::to_value(&report) {
            Ok(body) => body,
            Err(error) => {
                tracing::error!(severity = "critical", %error, "failed to encode error report");
                return;
            }
        };
        if let Err(error) = self.store.post(&self.config.error_sink_path, body).await {
            tracing::error!(
                severity = "critical",
                %error,
                sink = %self.config.error_sink_path,
                "failed to post error report"
            );
        }
    }
}

pub(crate) fn decode<T: serde::de::DeserializeOwned>(
    path: &str,
    doc: Value,
) -> Result<T, EnrollmentError> {
    serde_json::from_value(doc).map_err(|source| EnrollmentError::Decode {
        path: path.to_string(),
        source,
    })
}

pub(crate) fn encode<T: serde::Serialize>(record: &T) -> Result<Value, EnrollmentError> {
    serde_json::to_value(record).map_err(EnrollmentError::Encode)
}

/// Reject a status change the enrollment state machine does not allow.
pub(crate) fn ensure_transition(
    lesson_id: &str,
    student_id: &str,
    from: EnrollmentStatus,
    to: EnrollmentStatus,
) -> Result<(), EnrollmentError> {
    if from.can_transition_to(to) {
        return Ok(());
    }
    Err(EnrollmentError::Core(CoreError::InvalidTransition {
        entity_type: "enrollment".to_string(),
        id: format!("{lesson_id}/{student_id}"),
        from: from.to_string(),
        to: to.to_string(),
    }))
}

fn not_found(entity_type: &str, id: &str) -> EnrollmentError {
    EnrollmentError::Core(CoreError::NotFound {
        entity_type: entity_type.to_string(),
        id: id.to_string(),
    })
}
