//! # tutti-enroll
//!
//! Enrollment workflow for theory lessons.
//!
//! [`EnrollmentService`] validates requests, writes the canonical lesson
//! document and the student's mirror, manages the waitlist, and unwinds
//! partial writes. All state lives in a [`tutti_store::RecordStore`]; the
//! service itself holds no locks.
//!
//! Seat-taking writes carry a `currentEnrollment < maxStudents`
//! precondition (toggled by `EnrollmentConfig::capacity_guard`), so
//! concurrent requests cannot oversell the last seat.

mod coordinator;
pub mod error;
pub mod options;
mod rollback;
pub mod service;
mod validator;
mod waitlist;

pub use error::EnrollmentError;
pub use options::{EnrollOptions, UnenrollOptions};
pub use service::EnrollmentService;
