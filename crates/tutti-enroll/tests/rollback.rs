//! Idempotent rollback and critical error reporting.

mod common;

use common::*;
use pretty_assertions::assert_eq;
use tutti_core::enums::EnrollmentStatus;
use tutti_store::RecordStore;

#[tokio::test]
async fn rollback_without_prior_writes_is_a_clean_noop() {
    let svc = service();
    let lesson = seeded_lesson("thr-01", 10, &["stu-a"], true);
    put_lesson(svc.store(), &lesson).await;
    put_student(svc.store(), &student("stu-01")).await;

    let report = svc.rollback_enrollment("thr-01", "stu-01").await;
    assert!(report.is_clean());
    assert!(!report.lesson_reverted);

    assert_eq!(get_lesson(svc.store(), "thr-01").await, lesson);
    assert_eq!(get_student(svc.store(), "stu-01").await, student("stu-01"));
    assert!(svc.store().documents("system/errors").unwrap().is_empty());
}

#[tokio::test]
async fn rollback_of_missing_documents_does_not_create_records() {
    let svc = service();
    let report = svc.rollback_enrollment("thr-none", "stu-none").await;
    assert!(report.is_clean());
    assert!(svc.store().documents("theory").unwrap().is_empty());
    assert!(svc.store().documents("student").unwrap().is_empty());
    assert!(svc.store().documents("system/errors").unwrap().is_empty());
}

#[tokio::test]
async fn rollback_removes_both_halves_and_replays_safely() {
    let svc = service();
    put_lesson(svc.store(), &seeded_lesson("thr-01", 10, &["stu-a", "stu-01"], true)).await;
    let mut s = student("stu-01");
    s.enrollments.theory_lessons.push(mirror("thr-01", EnrollmentStatus::Inactive));
    s.enrollments.theory_lessons.push(mirror("thr-01", EnrollmentStatus::Active));
    put_student(svc.store(), &s).await;

    let first = svc.rollback_enrollment("thr-01", "stu-01").await;
    assert!(first.lesson_reverted);
    assert!(first.student_reverted);
    assert!(first.is_clean());

    let lesson = get_lesson(svc.store(), "thr-01").await;
    assert_eq!(lesson.capacity.current_enrollment, 1);
    assert_capacity_invariant(&lesson);
    let stored = get_student(svc.store(), "stu-01").await;
    assert_eq!(stored.enrollments.theory_lessons.len(), 1);
    assert_eq!(stored.enrollments.theory_lessons[0].status, EnrollmentStatus::Inactive);

    let second = svc.rollback_enrollment("thr-01", "stu-01").await;
    assert!(second.is_clean());
    assert!(!second.lesson_reverted);
    assert_eq!(get_lesson(svc.store(), "thr-01").await, lesson);
}

#[tokio::test]
async fn unexpected_failures_are_reported_to_the_error_sink() {
    let svc = faulty_service();
    put_lesson(svc.store(), &seeded_lesson("thr-01", 10, &["stu-01"], true)).await;
    put_student(svc.store(), &student("stu-01")).await;
    svc.store().fail_patches_to("/theory/");

    let report = svc.rollback_enrollment("thr-01", "stu-01").await;
    assert!(!report.is_clean());
    assert!(report.student_reverted);
    assert_eq!(report.failures.len(), 1);
    assert!(report.failures[0].starts_with("lesson: "));

    let sink = svc.store().inner.documents("system/errors").unwrap();
    assert_eq!(sink.len(), 1);
    assert_eq!(sink[0]["severity"], "critical");
    assert_eq!(sink[0]["operation"], "enrollment_rollback");
    assert_eq!(sink[0]["lessonId"], "thr-01");
    assert_eq!(sink[0]["studentId"], "stu-01");
}

#[tokio::test]
async fn failing_error_sink_is_swallowed() {
    let svc = faulty_service();
    put_lesson(svc.store(), &seeded_lesson("thr-01", 10, &["stu-01"], true)).await;
    svc.store().fail_patches_to("/theory/");
    svc.store().fail_posts();

    let report = svc.rollback_enrollment("thr-01", "stu-01").await;
    assert_eq!(report.failures.len(), 1);

    svc.store().heal();
    let lesson = svc.store().get("/theory/thr-01").await.unwrap();
    assert_eq!(lesson["capacity"]["currentEnrollment"], 1);
}
