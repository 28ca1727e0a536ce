use serde::Serialize;

use crate::cli::GlobalFlags;
use crate::cli::subcommands::WaitlistCommands;
use crate::commands::enrollment::enroll_options;
use crate::context::AppContext;
use crate::output::output;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ProcessResponse {
    lesson_id: String,
    promoted: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PositionResponse {
    lesson_id: String,
    student_id: String,
    rank: Option<u32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct NextPositionResponse {
    lesson_id: String,
    position: u32,
}

/// Handle `tutti waitlist`.
pub async fn handle(
    action: WaitlistCommands,
    ctx: &AppContext,
    flags: &GlobalFlags,
) -> anyhow::Result<()> {
    match action {
        WaitlistCommands::Add(args) => {
            let (lesson_id, student_id) = (args.target.lesson_id.clone(), args.target.student_id.clone());
            let placement = ctx
                .service
                .add_to_waitlist(&lesson_id, &student_id, enroll_options(args))
                .await?;
            output(&placement, flags.format)
        }
        WaitlistCommands::Process { lesson_id } => {
            let promoted = ctx.service.process_waitlist(&lesson_id).await?;
            output(&ProcessResponse { lesson_id, promoted }, flags.format)
        }
        WaitlistCommands::Promote(args) => {
            let response = ctx
                .service
                .enroll_from_waitlist(&args.lesson_id, &args.student_id)
                .await?;
            output(&response, flags.format)
        }
        WaitlistCommands::Position(args) => {
            let rank = ctx
                .service
                .waitlist_position(&args.lesson_id, &args.student_id)
                .await?;
            output(
                &PositionResponse {
                    lesson_id: args.lesson_id,
                    student_id: args.student_id,
                    rank,
                },
                flags.format,
            )
        }
        WaitlistCommands::Next { lesson_id } => {
            let position = ctx.service.get_next_waitlist_position(&lesson_id).await?;
            output(&NextPositionResponse { lesson_id, position }, flags.format)
        }
    }
}
