//! Record paths and ID prefixes.
//!
//! Documents are addressed as `/{collection}/{id}`. Lessons live under
//! `/theory`, students under `/student`, and critical error reports are posted
//! to `/system/errors`.

/// Collection holding theory lesson documents.
pub const COLLECTION_THEORY: &str = "theory";

/// Collection holding student documents.
pub const COLLECTION_STUDENT: &str = "student";

/// Default sink for critical error reports.
pub const ERROR_SINK_PATH: &str = "/system/errors";

/// Prefix for IDs the store generates for posted documents without one.
pub const PREFIX_RECORD: &str = "rec";

/// Path of a theory lesson document.
#[must_use]
pub fn lesson_path(lesson_id: &str) -> String {
    format!("/{COLLECTION_THEORY}/{lesson_id}")
}

/// Path of a student document.
#[must_use]
pub fn student_path(student_id: &str) -> String {
    format!("/{COLLECTION_STUDENT}/{student_id}")
}
