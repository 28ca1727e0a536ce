use std::path::PathBuf;

use clap::Subcommand;

use crate::cli::root_commands::{EnrollArgs, PairArgs};

/// Theory lesson document commands.
#[derive(Clone, Debug, Subcommand)]
pub enum LessonCommands {
    /// Create or replace a lesson from JSON (file or stdin).
    Put {
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// Get a lesson by ID.
    Get { id: String },
}

/// Student document commands.
#[derive(Clone, Debug, Subcommand)]
pub enum StudentCommands {
    /// Create or replace a student from JSON (file or stdin).
    Put {
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// Get a student by ID.
    Get { id: String },
}

/// Waitlist commands.
#[derive(Clone, Debug, Subcommand)]
pub enum WaitlistCommands {
    /// Queue a student directly.
    Add(EnrollArgs),
    /// Promote the longest-waiting student if a seat is free.
    Process { lesson_id: String },
    /// Promote a specific waitlisted student.
    Promote(PairArgs),
    /// Live rank of a student in the waitlist.
    Position(PairArgs),
    /// Position the next queued student would be given.
    Next { lesson_id: String },
}
