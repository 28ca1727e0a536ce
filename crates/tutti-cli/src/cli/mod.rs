use clap::Parser;

pub mod global;
pub mod root_commands;
pub mod subcommands;

pub use global::{GlobalFlags, OutputFormat};
pub use root_commands::Commands;

/// Top-level CLI parser for the `tutti` binary.
#[derive(Debug, Parser)]
#[command(name = "tutti", version, about = "Tutti - theory lesson enrollment")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output format: json, raw
    #[arg(short, long, global = true, default_value = "json")]
    pub format: OutputFormat,

    /// Quiet mode (errors only)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Verbose mode (debug logging)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Database file (overrides `store.path` from config)
    #[arg(long, global = true)]
    pub db: Option<String>,
}

impl Cli {
    #[must_use]
    pub fn global_flags(&self) -> GlobalFlags {
        GlobalFlags {
            format: self.format,
            quiet: self.quiet,
            verbose: self.verbose,
            db: self.db.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::{CommandFactory, Parser};
    use pretty_assertions::assert_eq;

    use super::subcommands::{LessonCommands, WaitlistCommands};
    use super::{Cli, Commands, OutputFormat};

    #[test]
    fn clap_command_tree_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn global_flags_parse_before_subcommand() {
        let cli = Cli::try_parse_from([
            "tutti", "--format", "raw", "--db", "/tmp/t.db", "--verbose", "status", "thr-1",
            "stu-1",
        ])
        .expect("cli should parse");

        assert_eq!(cli.format, OutputFormat::Raw);
        assert_eq!(cli.db.as_deref(), Some("/tmp/t.db"));
        assert!(cli.verbose);
        assert!(matches!(cli.command, Commands::Status(_)));
    }

    #[test]
    fn global_flags_parse_after_subcommand() {
        let cli = Cli::try_parse_from(["tutti", "rollback", "thr-1", "stu-1", "--quiet"])
            .expect("cli should parse");
        assert!(cli.quiet);
        assert_eq!(cli.format, OutputFormat::Json);
    }

    #[test]
    fn output_format_rejects_table() {
        assert!(Cli::try_parse_from(["tutti", "--format", "table", "status", "a", "b"]).is_err());
    }

    #[test]
    fn enroll_collects_options() {
        let cli = Cli::try_parse_from([
            "tutti",
            "enroll",
            "thr-1",
            "stu-1",
            "--performed-by",
            "admin",
            "--reason",
            "Placement test",
            "--transaction",
            "tx-9",
        ])
        .expect("cli should parse");
        let Commands::Enroll(args) = cli.command else {
            panic!("expected enroll");
        };
        assert_eq!(args.target.lesson_id, "thr-1");
        assert_eq!(args.target.student_id, "stu-1");
        assert_eq!(args.performed_by.as_deref(), Some("admin"));
        assert_eq!(args.reason.as_deref(), Some("Placement test"));
        assert_eq!(args.transaction.as_deref(), Some("tx-9"));
    }

    #[test]
    fn nested_subcommands_parse() {
        let cli = Cli::try_parse_from(["tutti", "waitlist", "process", "thr-1"])
            .expect("cli should parse");
        assert!(matches!(
            cli.command,
            Commands::Waitlist {
                action: WaitlistCommands::Process { .. }
            }
        ));

        let cli = Cli::try_parse_from(["tutti", "lesson", "put", "--file", "lesson.json"])
            .expect("cli should parse");
        let Commands::Lesson {
            action: LessonCommands::Put { file },
        } = cli.command
        else {
            panic!("expected lesson put");
        };
        assert_eq!(file.as_deref(), Some(std::path::Path::new("lesson.json")));
    }

    #[test]
    fn enroll_requires_both_ids() {
        assert!(Cli::try_parse_from(["tutti", "enroll", "thr-1"]).is_err());
    }
}
