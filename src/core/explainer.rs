//! Human-readable description of a program, without running it.
//!
//! Best effort: missing fields render as `unknown`, malformed tasks still get
//! a header line, and nothing here can fail.

use serde_json::Value;
use std::fmt::Write;

const UNKNOWN: &str = "unknown";
const PROMPT_PREVIEW_CHARS: usize = 50;

/// Describe every task in `program`.
pub fn explain(program: &Value) -> String {
    let Some(pipeline) = program.get("pipeline") else {
        return "Invalid program: missing pipeline".to_string();
    };
    let Some(tasks) = pipeline.as_array() else {
        return "Invalid program: pipeline must be a list".to_string();
    };

    let mut out = format!("This AION program contains {} tasks:\n\n", tasks.len());
    for (i, task) in tasks.iter().enumerate() {
        let kind = task.get("task").and_then(Value::as_str).unwrap_or(UNKNOWN);
        let _ = writeln!(out, "{}. **{}** task", i + 1, kind.to_uppercase());
        if let Some(detail) = describe(kind, task) {
            let _ = writeln!(out, "   - {}", detail);
        }
        out.push('\n');
    }
    out
}

fn describe(kind: &str, task: &Value) -> Option<String> {
    let detail = match kind {
        "filter" => {
            let cond = task.get("condition");
            format!(
                "Filters data where {} {} {}",
                text(cond.and_then(|c| c.get("field"))),
                text(cond.and_then(|c| c.get("operator"))),
                text(cond.and_then(|c| c.get("value"))),
            )
        }
        "sort" => {
            let op = task.get("operation");
            let order = op
                .and_then(|o| o.get("order"))
                .map_or_else(|| "asc".to_string(), |v| text(Some(v)));
            format!(
                "Sorts data by {} in {}ending order",
                text(op.and_then(|o| o.get("field"))),
                order
            )
        }
        "transform" => format!("Transforms fields: {}", keys(task.get("mapping"))),
        "model_call" => {
            let prompt = text(task.get("prompt"));
            let preview: String = prompt.chars().take(PROMPT_PREVIEW_CHARS).collect();
            format!("Calls AI model with prompt: {}...", preview)
        }
        "aggregate" => {
            let group_by = match task.get("group_by").and_then(Value::as_array) {
                Some(fields) if !fields.is_empty() => fields
                    .iter()
                    .map(|f| text(Some(f)))
                    .collect::<Vec<_>>()
                    .join(", "),
                _ => UNKNOWN.to_string(),
            };
            format!(
                "Groups by {} and aggregates {}",
                group_by,
                keys(task.get("aggregations"))
            )
        }
        "export" => {
            let format = task
                .get("format")
                .map_or_else(|| "csv".to_string(), |v| text(Some(v)));
            format!(
                "Exports data to {} as {}",
                text(task.get("file_path")),
                format
            )
        }
        _ => return None,
    };
    Some(detail)
}

/// Strings unquoted, everything else as compact JSON, `unknown` when absent.
fn text(value: Option<&Value>) -> String {
    match value {
        None => UNKNOWN.to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

fn keys(value: Option<&Value>) -> String {
    match value.and_then(Value::as_object) {
        Some(map) if !map.is_empty() => map.keys().cloned().collect::<Vec<_>>().join(", "),
        _ => UNKNOWN.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_explainer_missing_pipeline() {
        assert_eq!(explain(&json!({})), "Invalid program: missing pipeline");
        assert_eq!(explain(&json!("nope")), "Invalid program: missing pipeline");
        assert_eq!(
            explain(&json!({"pipeline": 3})),
            "Invalid program: pipeline must be a list"
        );
    }

    #[test]
    fn test_explainer_full_program() {
        let text = explain(&json!({"pipeline": [
            {"task": "filter", "condition": {"field": "age", "operator": ">", "value": 30}},
            {"task": "sort", "operation": {"field": "score", "order": "desc"}},
            {"task": "transform", "mapping": {"full_name": "name", "tag": 1}},
            {"task": "aggregate", "group_by": ["status"], "aggregations": {"age": "mean"}},
            {"task": "export", "file_path": "out.json", "format": "json"}
        ]}));
        let expected = "This AION program contains 5 tasks:\n\n\
            1. **FILTER** task\n   - Filters data where age > 30\n\n\
            2. **SORT** task\n   - Sorts data by score in descending order\n\n\
            3. **TRANSFORM** task\n   - Transforms fields: full_name, tag\n\n\
            4. **AGGREGATE** task\n   - Groups by status and aggregates age\n\n\
            5. **EXPORT** task\n   - Exports data to out.json as json\n\n";
        assert_eq!(text, expected);
    }

    #[test]
    fn test_explainer_prompt_truncated() {
        let prompt = "x".repeat(80);
        let text = explain(&json!({"pipeline": [{"task": "model_call", "prompt": prompt}]}));
        assert!(text.contains(&format!("prompt: {}...\n", "x".repeat(50))));
    }

    #[test]
    fn test_explainer_unknown_placeholders() {
        let text = explain(&json!({"pipeline": [
            {"task": "filter"},
            {"task": "sort", "operation": "bad"},
            {"task": "model_call"},
            {"task": "export"}
        ]}));
        assert!(text.contains("Filters data where unknown unknown unknown"));
        assert!(text.contains("Sorts data by unknown in ascending order"));
        assert!(text.contains("Calls AI model with prompt: unknown..."));
        assert!(text.contains("Exports data to unknown as csv"));
    }

    #[test]
    fn test_explainer_malformed_tasks_never_fail() {
        let text = explain(&json!({"pipeline": [42, {"task": "foobar"}, {"condition": {}}]}));
        assert!(text.starts_with("This AION program contains 3 tasks:"));
        assert!(text.contains("1. **UNKNOWN** task\n\n"));
        assert!(text.contains("2. **FOOBAR** task\n\n"));
        assert!(text.contains("3. **UNKNOWN** task\n\n"));
    }
}
