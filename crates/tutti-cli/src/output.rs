use serde::Serialize;

use crate::cli::OutputFormat;

/// Render a serializable response to a string in the requested format.
pub fn render<T: Serialize>(value: &T, format: OutputFormat) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(value)?),
        OutputFormat::Raw => Ok(serde_json::to_string(value)?),
    }
}

/// Print a serializable response in the requested format.
pub fn output<T: Serialize>(value: &T, format: OutputFormat) -> anyhow::Result<()> {
    let rendered = render(value, format)?;
    println!("{rendered}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use serde::Serialize;

    use super::render;
    use crate::cli::OutputFormat;

    #[derive(Serialize)]
    #[serde(rename_all = "camelCase")]
    struct Example {
        lesson_id: &'static str,
        position: u32,
    }

    #[test]
    fn json_render_is_valid_json() {
        let value = Example { lesson_id: "thr-1", position: 2 };
        let out = render(&value, OutputFormat::Json).expect("json render should work");
        let parsed: serde_json::Value = serde_json::from_str(&out).expect("json should parse");
        assert_eq!(parsed["lessonId"], "thr-1");
        assert_eq!(parsed["position"], 2);
    }

    #[test]
    fn raw_render_is_single_line_json() {
        let value = Example { lesson_id: "thr-1", position: 2 };
        let out = render(&value, OutputFormat::Raw).expect("raw render should work");
        assert!(!out.contains('\n'));
        let parsed: serde_json::Value = serde_json::from_str(&out).expect("json should parse");
        assert_eq!(parsed["position"], 2);
    }

    #[test]
    fn none_renders_as_null() {
        let out = render(&Option::<u32>::None, OutputFormat::Raw).unwrap();
        assert_eq!(out, "null");
    }
}
