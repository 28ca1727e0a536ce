//! Shared fixtures for enrollment integration tests.

#![allow(dead_code)]

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;
use tutti_config::EnrollmentConfig;
use tutti_core::entities::{
    AcademicInfo, AcademicRequirements, Capacity, Enrollment, LessonEnrollment, LessonMirror,
    Schedule, Student, StudentEnrollments, TheoryLesson, WaitlistEntry,
};
use tutti_core::enums::{AuditAction, DayOfWeek, EnrollmentMethod, EnrollmentStatus};
use tutti_enroll::EnrollmentService;
use tutti_store::{MemoryStore, PatchOptions, RecordStore, StoreError, UpdateBuilder, UpdateSpec};

pub fn ts(minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 9, 1, 8, minute, 0).unwrap()
}

pub fn lesson(id: &str, day: DayOfWeek, start: &str, end: &str) -> TheoryLesson {
    TheoryLesson {
        id: id.into(),
        title: None,
        is_active: true,
        schedule: Schedule {
            day_of_week: day,
            start_time: start.into(),
            end_time: end.into(),
        },
        capacity: Capacity {
            max_students: Some(10),
            current_enrollment: 0,
            waitlist_enabled: true,
        },
        academic_requirements: AcademicRequirements::default(),
        enrollment: LessonEnrollment::default(),
    }
}

/// A Monday 10:00-11:00 lesson with `seated` active students.
pub fn seeded_lesson(id: &str, max: u32, seated: &[&str], waitlist_enabled: bool) -> TheoryLesson {
    let mut l = lesson(id, DayOfWeek::Monday, "10:00", "11:00");
    l.capacity.max_students = Some(max);
    l.capacity.waitlist_enabled = waitlist_enabled;
    l.enrollment.enrolled_students = seated
        .iter()
        .map(|sid| Enrollment {
            student_id: (*sid).into(),
            enrolled_at: ts(0),
            status: EnrollmentStatus::Active,
            enrollment_method: EnrollmentMethod::Manual,
            performed_by: "admin".into(),
        })
        .collect();
    l.capacity.current_enrollment = u32::try_from(seated.len()).unwrap();
    l
}

pub fn queued(student_id: &str, minute: u32, position: u32) -> WaitlistEntry {
    WaitlistEntry {
        student_id: student_id.into(),
        queued_at: ts(minute),
        position,
    }
}

pub fn student(id: &str) -> Student {
    Student {
        id: id.into(),
        full_name: None,
        is_active: true,
        academic_info: AcademicInfo::default(),
        enrollments: StudentEnrollments::default(),
    }
}

pub fn mirror(lesson_id: &str, status: EnrollmentStatus) -> LessonMirror {
    let action = if status == EnrollmentStatus::Waitlist {
        AuditAction::Waitlisted
    } else {
        AuditAction::Enrolled
    };
    LessonMirror::opened(lesson_id, status, EnrollmentMethod::Manual, "admin", action, None, ts(0))
}

pub async fn put_lesson<S: RecordStore>(store: &S, lesson: &TheoryLesson) {
    store
        .post("/theory", serde_json::to_value(lesson).unwrap())
        .await
        .unwrap();
}

pub async fn put_student<S: RecordStore>(store: &S, student: &Student) {
    store
        .post("/student", serde_json::to_value(student).unwrap())
        .await
        .unwrap();
}

pub async fn get_lesson<S: RecordStore>(store: &S, id: &str) -> TheoryLesson {
    serde_json::from_value(store.get(&format!("/theory/{id}")).await.unwrap()).unwrap()
}

pub async fn get_student<S: RecordStore>(store: &S, id: &str) -> Student {
    serde_json::from_value(store.get(&format!("/student/{id}")).await.unwrap()).unwrap()
}

pub fn service() -> EnrollmentService<MemoryStore> {
    EnrollmentService::new(MemoryStore::new(), EnrollmentConfig::default())
}

pub fn faulty_service() -> EnrollmentService<FaultyStore> {
    EnrollmentService::new(FaultyStore::default(), EnrollmentConfig::default())
}

pub fn racing_service(store: RacingStore) -> EnrollmentService<RacingStore> {
    EnrollmentService::new(store, EnrollmentConfig::default())
}

/// `currentEnrollment` equals the number of active seats.
pub fn assert_capacity_invariant(lesson: &TheoryLesson) {
    assert_eq!(
        usize::try_from(lesson.capacity.current_enrollment).unwrap(),
        lesson.active_count(),
        "currentEnrollment out of sync for {}",
        lesson.id
    );
}

/// A `MemoryStore` that can be told to fail patches or posts.
#[derive(Default)]
pub struct FaultyStore {
    pub inner: MemoryStore,
    /// Patches to paths starting with this prefix fail.
    fail_patch_prefix: Mutex<Option<String>>,
    /// Number of matching patches to let through before failing.
    pass_before_fail: Mutex<usize>,
    fail_posts: Mutex<bool>,
}

impl FaultyStore {
    pub fn fail_patches_to(&self, prefix: &str) {
        self.fail_patches_after(prefix, 0);
    }

    pub fn fail_patches_after(&self, prefix: &str, passes: usize) {
        *self.fail_patch_prefix.lock().unwrap() = Some(prefix.to_string());
        *self.pass_before_fail.lock().unwrap() = passes;
    }

    pub fn heal(&self) {
        *self.fail_patch_prefix.lock().unwrap() = None;
        *self.fail_posts.lock().unwrap() = false;
    }

    pub fn fail_posts(&self) {
        *self.fail_posts.lock().unwrap() = true;
    }

    fn should_fail(&self, path: &str) -> bool {
        let prefix = self.fail_patch_prefix.lock().unwrap();
        let Some(prefix) = prefix.as_deref() else {
            return false;
        };
        if !path.starts_with(prefix) {
            return false;
        }
        let mut passes = self.pass_before_fail.lock().unwrap();
        if *passes > 0 {
            *passes -= 1;
            return false;
        }
        true
    }
}

impl RecordStore for FaultyStore {
    async fn get(&self, path: &str) -> Result<Value, StoreError> {
        self.inner.get(path).await
    }

    async fn patch(
        &self,
        path: &str,
        update: &UpdateSpec,
        options: &PatchOptions,
    ) -> Result<Value, StoreError> {
        if self.should_fail(path) {
            return Err(StoreError::Query(format!("injected failure on {path}")));
        }
        self.inner.patch(path, update, options).await
    }

    async fn post(&self, path: &str, body: Value) -> Result<Value, StoreError> {
        if *self.fail_posts.lock().unwrap() {
            return Err(StoreError::Query(format!("injected failure on {path}")));
        }
        self.inner.post(path, body).await
    }
}

/// A `MemoryStore` where a rival request enrolls the same student, stamped
/// `ts(5)`, right before the first patch under `race_on` runs.
pub struct RacingStore {
    pub inner: MemoryStore,
    lesson_id: String,
    student_id: String,
    race_on: &'static str,
    fail_after_race: bool,
    raced: AtomicBool,
}

impl RacingStore {
    /// The rival lands just before the lesson write.
    pub fn before_lesson_write(lesson_id: &str, student_id: &str) -> Self {
        Self::new(lesson_id, student_id, "/theory/", false)
    }

    /// The rival lands just before the student write, which then fails.
    pub fn before_failing_student_write(lesson_id: &str, student_id: &str) -> Self {
        Self::new(lesson_id, student_id, "/student/", true)
    }

    fn new(lesson_id: &str, student_id: &str, race_on: &'static str, fail_after_race: bool) -> Self {
        Self {
            inner: MemoryStore::new(),
            lesson_id: lesson_id.into(),
            student_id: student_id.into(),
            race_on,
            fail_after_race,
            raced: AtomicBool::new(false),
        }
    }

    async fn land_rival(&self) -> Result<(), StoreError> {
        let seat = Enrollment {
            student_id: self.student_id.clone(),
            enrolled_at: ts(5),
            status: EnrollmentStatus::Active,
            enrollment_method: EnrollmentMethod::Manual,
            performed_by: "rival".into(),
        };
        let mut rival_mirror = mirror(&self.lesson_id, EnrollmentStatus::Active);
        rival_mirror.enrolled_at = ts(5);
        self.inner
            .patch(
                &format!("/theory/{}", self.lesson_id),
                &UpdateBuilder::new()
                    .push("enrollment.enrolledStudents", serde_json::to_value(seat).unwrap())
                    .inc("capacity.currentEnrollment", 1)
                    .build(),
                &PatchOptions::new(),
            )
            .await?;
        self.inner
            .patch(
                &format!("/student/{}", self.student_id),
                &UpdateBuilder::new()
                    .push("enrollments.theoryLessons", serde_json::to_value(rival_mirror).unwrap())
                    .build(),
                &PatchOptions::new(),
            )
            .await?;
        Ok(())
    }
}

impl RecordStore for RacingStore {
    async fn get(&self, path: &str) -> Result<Value, StoreError> {
        self.inner.get(path).await
    }

    async fn patch(
        &self,
        path: &str,
        update: &UpdateSpec,
        options: &PatchOptions,
    ) -> Result<Value, StoreError> {
        if path.starts_with(self.race_on) && !self.raced.swap(true, Ordering::SeqCst) {
            self.land_rival().await?;
            if self.fail_after_race {
                return Err(StoreError::Query(format!("injected failure on {path}")));
            }
        }
        self.inner.patch(path, update, options).await
    }

    async fn post(&self, path: &str, body: Value) -> Result<Value, StoreError> {
        self.inner.post(path, body).await
    }
}
