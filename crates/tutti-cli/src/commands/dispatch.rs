use crate::cli::GlobalFlags;
use crate::cli::root_commands::Commands;
use crate::commands;
use crate::context::AppContext;

/// Dispatch a parsed command to the corresponding handler module.
pub async fn dispatch(
    command: Commands,
    ctx: &AppContext,
    flags: &GlobalFlags,
) -> anyhow::Result<()> {
    match command {
        Commands::Lesson { action } => commands::lesson::handle(&action, ctx, flags).await,
        Commands::Student { action } => commands::student::handle(&action, ctx, flags).await,
        Commands::Validate(args) => commands::enrollment::handle_validate(&args, ctx, flags).await,
        Commands::Enroll(args) => commands::enrollment::handle_enroll(args, ctx, flags).await,
        Commands::Unenroll(args) => commands::enrollment::handle_unenroll(args, ctx, flags).await,
        Commands::Status(args) => commands::enrollment::handle_status(&args, ctx, flags).await,
        Commands::Rollback(args) => commands::enrollment::handle_rollback(&args, ctx, flags).await,
        Commands::Waitlist { action } => commands::waitlist::handle(action, ctx, flags).await,
    }
}
