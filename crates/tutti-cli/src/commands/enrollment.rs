use tutti_enroll::{EnrollOptions, UnenrollOptions};
use tutti_store::TransactionHandle;

use crate::cli::GlobalFlags;
use crate::cli::root_commands::{EnrollArgs, PairArgs, UnenrollArgs};
use crate::context::AppContext;
use crate::output::output;

/// Handle `tutti validate`. An invalid report is printed, not raised.
pub async fn handle_validate(
    args: &PairArgs,
    ctx: &AppContext,
    flags: &GlobalFlags,
) -> anyhow::Result<()> {
    let report = ctx
        .service
        .validate_enrollment(&args.lesson_id, &args.student_id)
        .await?;
    output(&report, flags.format)
}

/// Handle `tutti enroll`.
pub async fn handle_enroll(
    args: EnrollArgs,
    ctx: &AppContext,
    flags: &GlobalFlags,
) -> anyhow::Result<()> {
    let (lesson_id, student_id) = (args.target.lesson_id.clone(), args.target.student_id.clone());
    let response = ctx
        .service
        .enroll_student(&lesson_id, &student_id, enroll_options(args))
        .await?;
    output(&response, flags.format)
}

/// Handle `tutti unenroll`.
pub async fn handle_unenroll(
    args: UnenrollArgs,
    ctx: &AppContext,
    flags: &GlobalFlags,
) -> anyhow::Result<()> {
    let mut options = UnenrollOptions::new();
    if let Some(actor) = args.performed_by {
        options = options.performed_by(actor);
    }
    if let Some(reason) = args.reason {
        options = options.reason(reason);
    }
    if let Some(tx) = args.transaction {
        options = options.transaction(TransactionHandle(tx));
    }
    let response = ctx
        .service
        .unenroll_student(&args.target.lesson_id, &args.target.student_id, options)
        .await?;
    output(&response, flags.format)
}

/// Handle `tutti status`. Prints `null` when the student holds no record.
pub async fn handle_status(
    args: &PairArgs,
    ctx: &AppContext,
    flags: &GlobalFlags,
) -> anyhow::Result<()> {
    let lookup = ctx
        .service
        .get_student_enrollment(&args.lesson_id, &args.student_id)
        .await?;
    output(&lookup, flags.format)
}

/// Handle `tutti rollback`.
pub async fn handle_rollback(
    args: &PairArgs,
    ctx: &AppContext,
    flags: &GlobalFlags,
) -> anyhow::Result<()> {
    let report = ctx
        .service
        .rollback_enrollment(&args.lesson_id, &args.student_id)
        .await;
    if !report.is_clean() {
        tracing::warn!(
            lesson_id = %args.lesson_id,
            student_id = %args.student_id,
            failures = ?report.failures,
            "rollback left records to reconcile"
        );
    }
    output(&report, flags.format)
}

/// Build `EnrollOptions` from `--performed-by`, `--reason`, and `--transaction`.
pub fn enroll_options(args: EnrollArgs) -> EnrollOptions {
    let mut options = EnrollOptions::new();
    if let Some(actor) = args.performed_by {
        options = options.performed_by(actor);
    }
    if let Some(reason) = args.reason {
        options = options.reason(reason);
    }
    if let Some(tx) = args.transaction {
        options = options.transaction(TransactionHandle(tx));
    }
    options
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use tutti_core::enums::{EnrollmentOutcome, EnrollmentStatus};

    use super::*;
    use crate::commands::test_support::{LESSON, memory_context, student};
    use crate::commands::{lesson, student as student_cmd};

    fn args(performed_by: Option<&str>) -> EnrollArgs {
        EnrollArgs {
            target: PairArgs {
                lesson_id: "thr-1".into(),
                student_id: "stu-1".into(),
            },
            performed_by: performed_by.map(str::to_string),
            reason: None,
            transaction: Some("tx-1".into()),
        }
    }

    #[test]
    fn enroll_options_carry_flags() {
        let options = enroll_options(args(Some("admin")));
        assert_eq!(options.performed_by.as_deref(), Some("admin"));
        assert_eq!(options.transaction, Some(TransactionHandle("tx-1".into())));
        assert!(options.reason.is_none());
    }

    #[tokio::test]
    async fn seeded_records_flow_through_the_libsql_store() {
        let ctx = memory_context().await;
        lesson::put(&ctx, LESSON).await.unwrap();
        student_cmd::put(&ctx, &student("stu-1")).await.unwrap();
        student_cmd::put(&ctx, &student("stu-2")).await.unwrap();

        let first = ctx
            .service
            .enroll_student("thr-1", "stu-1", enroll_options(args(None)))
            .await
            .unwrap();
        assert_eq!(first.status, EnrollmentOutcome::Enrolled);

        // One seat: the second student is queued.
        let second = ctx
            .service
            .enroll_student("thr-1", "stu-2", EnrollOptions::new())
            .await
            .unwrap();
        assert_eq!(second.status, EnrollmentOutcome::Waitlist);
        assert_eq!(second.position, Some(1));

        let status = ctx
            .service
            .get_student_enrollment("thr-1", "stu-2")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(status.status, EnrollmentStatus::Waitlist);
        assert_eq!(status.waitlist_rank, Some(1));

        let stored = lesson::get(&ctx, "thr-1").await.unwrap();
        assert_eq!(stored.capacity.current_enrollment, 1);
        assert_eq!(stored.enrollment.enrolled_students[0].performed_by, "system");
    }
}
