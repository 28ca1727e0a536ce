pub mod dispatch;
pub mod enrollment;
pub mod lesson;
pub mod student;
pub mod waitlist;

use std::io::Read;
use std::path::Path;

use anyhow::Context;

/// Read a JSON document from `file`, or from stdin when no file is given.
fn read_input(file: Option<&Path>) -> anyhow::Result<String> {
    match file {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display())),
        None => {
            let mut raw = String::new();
            std::io::stdin()
                .read_to_string(&mut raw)
                .context("failed to read JSON from stdin")?;
            Ok(raw)
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use tutti_config::TuttiConfig;

    use crate::context::AppContext;

    pub async fn memory_context() -> AppContext {
        AppContext::init(TuttiConfig::default(), Some(":memory:"))
            .await
            .expect("in-memory context should open")
    }

    pub const LESSON: &str = r#"{
        "id": "thr-1",
        "isActive": true,
        "schedule": {"dayOfWeek": "monday", "startTime": "10:00", "endTime": "11:00"},
        "capacity": {"maxStudents": 1, "currentEnrollment": 0, "waitlistEnabled": true}
    }"#;

    pub fn student(id: &str) -> String {
        format!(r#"{{"id": "{id}", "isActive": true}}"#)
    }
}
