use anyhow::Context;
use tutti_core::entities::TheoryLesson;
use tutti_core::ids::lesson_path;
use tutti_store::RecordStore;

use crate::cli::GlobalFlags;
use crate::cli::subcommands::LessonCommands;
use crate::commands::read_input;
use crate::context::AppContext;
use crate::output::output;

/// Handle `tutti lesson`.
pub async fn handle(
    action: &LessonCommands,
    ctx: &AppContext,
    flags: &GlobalFlags,
) -> anyhow::Result<()> {
    match action {
        LessonCommands::Put { file } => {
            let raw = read_input(file.as_deref())?;
            output(&put(ctx, &raw).await?, flags.format)
        }
        LessonCommands::Get { id } => output(&get(ctx, id).await?, flags.format),
    }
}

/// Parse `raw` as a lesson and store it, replacing any lesson with the same ID.
pub async fn put(ctx: &AppContext, raw: &str) -> anyhow::Result<TheoryLesson> {
    let lesson: TheoryLesson =
        serde_json::from_str(raw).context("input is not a valid theory lesson document")?;
    let stored = ctx
        .service
        .store()
        .post("/theory", serde_json::to_value(&lesson)?)
        .await
        .with_context(|| format!("failed to store lesson {}", lesson.id))?;
    tracing::info!(lesson_id = %lesson.id, "lesson stored");
    Ok(serde_json::from_value(stored)?)
}

pub async fn get(ctx: &AppContext, id: &str) -> anyhow::Result<TheoryLesson> {
    let doc = ctx
        .service
        .store()
        .get(&lesson_path(id))
        .await
        .with_context(|| format!("failed to load lesson {id}"))?;
    serde_json::from_value(doc).with_context(|| format!("lesson {id} is malformed"))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::commands::test_support::{LESSON, memory_context};

    #[tokio::test]
    async fn put_then_get_fills_defaults() {
        let ctx = memory_context().await;
        let stored = put(&ctx, LESSON).await.unwrap();
        assert_eq!(stored.id, "thr-1");
        assert!(stored.enrollment.enrolled_students.is_empty());

        let fetched = get(&ctx, "thr-1").await.unwrap();
        assert_eq!(fetched, stored);
    }

    #[tokio::test]
    async fn malformed_lesson_is_rejected_before_writing() {
        let ctx = memory_context().await;
        let err = put(&ctx, r#"{"id": "thr-1"}"#).await.unwrap_err();
        assert!(err.to_string().contains("not a valid theory lesson"));
        assert!(get(&ctx, "thr-1").await.is_err());
    }
}
