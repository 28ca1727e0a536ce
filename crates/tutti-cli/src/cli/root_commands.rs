use clap::{Args, Subcommand};

use crate::cli::subcommands::{LessonCommands, StudentCommands, WaitlistCommands};

/// Top-level command tree.
#[derive(Clone, Debug, Subcommand)]
pub enum Commands {
    /// Theory lesson documents.
    Lesson {
        #[command(subcommand)]
        action: LessonCommands,
    },
    /// Student documents.
    Student {
        #[command(subcommand)]
        action: StudentCommands,
    },
    /// Check whether a student may enroll, without writing.
    Validate(PairArgs),
    /// Enroll a student (or queue them when the lesson is full).
    Enroll(EnrollArgs),
    /// Remove a student's seat or waitlist entry.
    Unenroll(UnenrollArgs),
    /// Show a student's current standing in a lesson.
    Status(PairArgs),
    /// Undo a partially written enrollment.
    Rollback(PairArgs),
    /// Waitlist management.
    Waitlist {
        #[command(subcommand)]
        action: WaitlistCommands,
    },
}

/// A lesson and a student.
#[derive(Clone, Debug, Args)]
pub struct PairArgs {
    /// Theory lesson ID.
    pub lesson_id: String,
    /// Student ID.
    pub student_id: String,
}

#[derive(Clone, Debug, Args)]
pub struct EnrollArgs {
    #[command(flatten)]
    pub target: PairArgs,
    /// Actor recorded on the enrollment (defaults to config).
    #[arg(long)]
    pub performed_by: Option<String>,
    /// Reason stored in the student's audit trail.
    #[arg(long)]
    pub reason: Option<String>,
    /// Transaction handle forwarded to the store.
    #[arg(long)]
    pub transaction: Option<String>,
}

#[derive(Clone, Debug, Args)]
pub struct UnenrollArgs {
    #[command(flatten)]
    pub target: PairArgs,
    #[arg(long)]
    pub performed_by: Option<String>,
    #[arg(long)]
    pub reason: Option<String>,
    #[arg(long)]
    pub transaction: Option<String>,
}
