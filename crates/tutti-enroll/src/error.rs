//! Enrollment error types.

use thiserror::Error;
use tutti_core::errors::CoreError;
use tutti_store::StoreError;

/// Errors surfaced by `EnrollmentService` operations.
#[derive(Debug, Error)]
pub enum EnrollmentError {
    /// The request failed one or more validation checks. Nothing was written.
    #[error("Enrollment validation failed: {}", errors.join("; "))]
    Validation { errors: Vec<String> },

    /// No active or waitlisted record exists for the pair.
    #[error("Student {student_id} is not enrolled in theory lesson {lesson_id}")]
    NotEnrolled {
        lesson_id: String,
        student_id: String,
    },

    /// A record store call failed.
    #[error("{context}: {source}")]
    Store {
        context: String,
        #[source]
        source: StoreError,
    },

    /// A stored document does not match the expected shape.
    #[error("Failed to decode {path}: {source}")]
    Decode {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    /// A record could not be encoded for the store.
    #[error("Failed to encode record: {0}")]
    Encode(#[source] serde_json::Error),

    #[error(transparent)]
    Core(#[from] CoreError),
}

impl EnrollmentError {
    pub(crate) fn store(context: impl Into<String>, source: StoreError) -> Self {
        Self::Store {
            context: context.into(),
            source,
        }
    }

    /// Whether a store precondition (capacity guard, membership guard)
    /// rejected the write.
    #[must_use]
    pub const fn is_precondition_failed(&self) -> bool {
        matches!(self, Self::Store { source, .. } if source.is_precondition_failed())
    }

    /// Reasons carried by a validation failure.
    #[must_use]
    pub fn validation_errors(&self) -> &[String] {
        match self {
            Self::Validation { errors } => errors,
            _ => &[],
        }
    }
}
