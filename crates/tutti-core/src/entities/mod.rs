//! Document structs for all Tutti records.
//!
//! Each entity maps to a JSON document in the record store. Field names use
//! camelCase because update specs address them by dotted path
//! (`capacity.currentEnrollment`, `enrollments.theoryLessons`). All structs
//! derive `Serialize`, `Deserialize`, and `JsonSchema`.

mod audit;
mod enrollment;
mod error_report;
mod lesson;
mod student;

pub use audit::MirrorAuditEntry;
pub use enrollment::{Enrollment, WaitlistEntry};
pub use error_report::ErrorReport;
pub use lesson::{AcademicRequirements, Capacity, LessonEnrollment, Schedule, TheoryLesson};
pub use student::{AcademicInfo, LessonMirror, Performance, Student, StudentEnrollments};
