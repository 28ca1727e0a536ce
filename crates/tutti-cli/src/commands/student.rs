use anyhow::Context;
use tutti_core::entities::Student;
use tutti_core::ids::student_path;
use tutti_store::RecordStore;

use crate::cli::GlobalFlags;
use crate::cli::subcommands::StudentCommands;
use crate::commands::read_input;
use crate::context::AppContext;
use crate::output::output;

/// Handle `tutti student`.
pub async fn handle(
    action: &StudentCommands,
    ctx: &AppContext,
    flags: &GlobalFlags,
) -> anyhow::Result<()> {
    match action {
        StudentCommands::Put { file } => {
            let raw = read_input(file.as_deref())?;
            output(&put(ctx, &raw).await?, flags.format)
        }
        StudentCommands::Get { id } => output(&get(ctx, id).await?, flags.format),
    }
}

pub async fn put(ctx: &AppContext, raw: &str) -> anyhow::Result<Student> {
    let student: Student =
        serde_json::from_str(raw).context("input is not a valid student document")?;
    let stored = ctx
        .service
        .store()
        .post("/student", serde_json::to_value(&student)?)
        .await
        .with_context(|| format!("failed to store student {}", student.id))?;
    tracing::info!(student_id = %student.id, "student stored");
    Ok(serde_json::from_value(stored)?)
}

pub async fn get(ctx: &AppContext, id: &str) -> anyhow::Result<Student> {
    let doc = ctx
        .service
        .store()
        .get(&student_path(id))
        .await
        .with_context(|| format!("failed to load student {id}"))?;
    serde_json::from_value(doc).with_context(|| format!("student {id} is malformed"))
}
