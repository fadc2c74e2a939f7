//! Program parsing and structural validation.
//!
//! Parses program files (JSON or YAML) into a raw `serde_json::Value` and
//! checks their shape before any table is touched:
//! - `pipeline` must exist and be a list (the only early exit)
//! - every task must be an object with a string `task` kind
//! - kind-specific required fields per task
//!
//! Errors accumulate across tasks and across fields of one task.

use super::types::{TaskKind, ValidationError};
use serde_json::{Map, Value};
use std::path::Path;

const EXPORT_FORMATS: [&str; 4] = ["csv", "json", "excel", "parquet"];

/// Parse a program file from disk. `.yaml`/`.yml` are read as YAML, anything else as JSON.
pub fn parse_program_file(path: &Path) -> Result<Value, String> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| format!("cannot read {}: {}", path.display(), e))?;
    match path.extension().and_then(|e| e.to_str()) {
        Some("yaml") | Some("yml") => parse_program_yaml(&content),
        _ => parse_program(&content),
    }
}

/// Parse a program from JSON text.
pub fn parse_program(json: &str) -> Result<Value, String> {
    serde_json::from_str(json).map_err(|e| format!("JSON parse error: {}", e))
}

/// Parse a program from YAML text.
pub fn parse_program_yaml(yaml: &str) -> Result<Value, String> {
    serde_yaml_ng::from_str(yaml).map_err(|e| format!("YAML parse error: {}", e))
}

/// Validate a parsed program. Returns a list of errors (empty = valid).
pub fn validate_program(program: &Value) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    let Some(pipeline) = program.get("pipeline") else {
        errors.push(ValidationError::new(
            "root",
            "Program must contain a 'pipeline' field",
        ));
        return errors;
    };

    let Some(tasks) = pipeline.as_array() else {
        errors.push(
            ValidationError::new("pipeline", "Pipeline must be a list of tasks").with_value(pipeline),
        );
        return errors;
    };

    for (i, task) in tasks.iter().enumerate() {
        validate_task(task, &format!("pipeline[{}]", i), &mut errors);
    }

    errors
}

fn validate_task(task: &Value, path: &str, errors: &mut Vec<ValidationError>) {
    let Some(obj) = task.as_object() else {
        errors.push(ValidationError::new(path, "Task must be a dictionary").with_value(task));
        return;
    };

    let kind_path = format!("{}.task", path);
    let Some(kind) = obj.get("task") else {
        errors.push(ValidationError::new(kind_path, "Task must have a 'task' field"));
        return;
    };
    let Some(kind) = kind.as_str() else {
        errors.push(ValidationError::new(kind_path, "Task type must be a string").with_value(kind));
        return;
    };

    let Ok(kind) = kind.parse::<TaskKind>() else {
        errors.push(
            ValidationError::new(
                kind_path,
                format!(
                    "Unknown task type: {}. Valid types: {}",
                    kind,
                    TaskKind::valid_names()
                ),
            )
            .with_value(&Value::String(kind.to_string())),
        );
        return;
    };

    let mut check = TaskCheck { obj, path, errors };
    match kind {
        TaskKind::Filter => check.filter(),
        TaskKind::Sort => check.sort(),
        TaskKind::Transform => check.transform(),
        TaskKind::ModelCall => check.model_call(),
        TaskKind::Aggregate => check.aggregate(),
        TaskKind::Export => check.export(),
    }
}

/// Field checks for one task object.
struct TaskCheck<'a> {
    obj: &'a Map<String, Value>,
    path: &'a str,
    errors: &'a mut Vec<ValidationError>,
}

impl<'a> TaskCheck<'a> {
    fn push(&mut self, field: &str, message: &str, value: Option<&Value>) {
        let mut err = ValidationError::new(format!("{}.{}", self.path, field), message);
        if let Some(v) = value {
            err = err.with_value(v);
        }
        self.errors.push(err);
    }

    /// Required field lookup; records `missing` when absent.
    fn require(&mut self, field: &str, missing: &str) -> Option<&'a Value> {
        let value = self.obj.get(field);
        if value.is_none() {
            self.push(field, missing, None);
        }
        value
    }

    /// Optional field that must be a string when present.
    fn optional_string(&mut self, field: &str, message: &str) {
        if let Some(v) = self.obj.get(field) {
            if !v.is_string() {
                self.push(field, message, Some(v));
            }
        }
    }

    fn filter(&mut self) {
        let Some(condition) = self.require("condition", "Filter task must have a 'condition' field")
        else {
            return;
        };
        let Some(condition) = condition.as_object() else {
            self.push("condition", "Condition must be a dictionary", Some(condition));
            return;
        };
        for key in ["field", "operator", "value"] {
            match condition.get(key) {
                None => self.push(
                    &format!("condition.{}", key),
                    &format!("Condition must have '{}' field", key),
                    None,
                ),
                Some(v) if key != "value" && !v.is_string() => self.push(
                    &format!("condition.{}", key),
                    &format!("Condition {} must be a string", key),
                    Some(v),
                ),
                Some(_) => {}
            }
        }
    }

    fn sort(&mut self) {
        let Some(operation) = self.require("operation", "Sort task must have an 'operation' field")
        else {
            return;
        };
        let Some(operation) = operation.as_object() else {
            self.push("operation", "Operation must be a dictionary", Some(operation));
            return;
        };
        match operation.get("field") {
            None => self.push("operation.field", "Sort operation must have a 'field'", None),
            Some(f) if !f.is_string() => {
                self.push("operation.field", "Sort field must be a string", Some(f))
            }
            Some(_) => {}
        }
        if let Some(order) = operation.get("order") {
            if !matches!(order.as_str(), Some("asc") | Some("desc")) {
                self.push("operation.order", "Sort order must be 'asc' or 'desc'", Some(order));
            }
        }
    }

    fn transform(&mut self) {
        let Some(mapping) = self.require("mapping", "Transform task must have a 'mapping' field")
        else {
            return;
        };
        if !mapping.is_object() {
            self.push("mapping", "Mapping must be a dictionary", Some(mapping));
        }
    }

    fn model_call(&mut self) {
        if let Some(prompt) = self.require("prompt", "Model call task must have 'prompt' field") {
            if !prompt.is_string() {
                self.push("prompt", "Prompt must be a string", Some(prompt));
            }
        }
        self.optional_string("input_field", "Input field must be a string");
        self.optional_string("output_field", "Output field must be a string");
        self.optional_string("provider", "Provider must be a string");
    }

    fn aggregate(&mut self) {
        if let Some(group_by) = self.require("group_by", "Aggregate task must have 'group_by' field") {
            let all_strings = group_by
                .as_array()
                .is_some_and(|fields| fields.iter().all(Value::is_string));
            if !all_strings {
                self.push("group_by", "Group by must be a list of fields", Some(group_by));
            }
        }
        if let Some(aggs) =
            self.require("aggregations", "Aggregate task must have 'aggregations' field")
        {
            if !aggs.is_object() {
                self.push("aggregations", "Aggregations must be a dictionary", Some(aggs));
            }
        }
    }

    fn export(&mut self) {
        if let Some(file_path) = self.require("file_path", "Export task must have 'file_path' field")
        {
            if !file_path.is_string() {
                self.push("file_path", "File path must be a string", Some(file_path));
            }
        }
        if let Some(format) = self.obj.get("format") {
            match format.as_str() {
                None => self.push("format", "Format must be a string", Some(format)),
                Some(f) if !EXPORT_FORMATS.contains(&f.to_lowercase().as_str()) => self.push(
                    "format",
                    "Format must be one of: csv, json, excel, parquet",
                    Some(format),
                ),
                Some(_) => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn locators(errors: &[ValidationError]) -> Vec<&str> {
        errors.iter().map(|e| e.locator.as_str()).collect()
    }

    #[test]
    fn test_validator_missing_pipeline() {
        let errors = validate_program(&json!({"steps": []}));
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].locator, "root");
        assert_eq!(errors[0].message, "Program must contain a 'pipeline' field");
    }

    #[test]
    fn test_validator_pipeline_not_list() {
        let errors = validate_program(&json!({"pipeline": {"task": "sort"}}));
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].locator, "pipeline");
    }

    #[test]
    fn test_validator_empty_pipeline_ok() {
        assert!(validate_program(&json!({"pipeline": []})).is_empty());
    }

    #[test]
    fn test_validator_valid_program() {
        let program = json!({"pipeline": [
            {"task": "filter", "condition": {"field": "age", "operator": ">", "value": 30}},
            {"task": "sort", "operation": {"field": "age", "order": "desc"}},
            {"task": "transform", "mapping": {"full": "name"}},
            {"task": "model_call", "prompt": "Summarize", "input_field": "name"},
            {"task": "aggregate", "group_by": ["status"], "aggregations": {"age": "mean"}},
            {"task": "export", "file_path": "out.csv", "format": "CSV"}
        ]});
        let errors = validate_program(&program);
        assert!(errors.is_empty(), "{:?}", errors);
    }

    #[test]
    fn test_validator_task_not_object() {
        let errors = validate_program(&json!({"pipeline": ["filter"]}));
        assert_eq!(locators(&errors), vec!["pipeline[0]"]);
        assert_eq!(errors[0].message, "Task must be a dictionary");
    }

    #[test]
    fn test_validator_missing_and_non_string_kind() {
        let errors = validate_program(&json!({"pipeline": [
            {"condition": {}},
            {"task": 7, "condition": {}}
        ]}));
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].message, "Task must have a 'task' field");
        assert_eq!(errors[1].message, "Task type must be a string");
        assert_eq!(locators(&errors), vec!["pipeline[0].task", "pipeline[1].task"]);
    }

    #[test]
    fn test_validator_unknown_kind() {
        let errors = validate_program(&json!({"pipeline": [{"task": "foobar"}]}));
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].locator, "pipeline[0].task");
        assert!(errors[0].message.contains("Unknown task type"));
        assert!(errors[0].message.contains("model_call"));
        assert_eq!(errors[0].value, Some(json!("foobar")));
    }

    #[test]
    fn test_validator_exhaustive_across_tasks() {
        let errors = validate_program(&json!({"pipeline": [
            {"task": "filter"},
            {"task": "sort", "operation": {"order": "up"}}
        ]}));
        assert_eq!(
            locators(&errors),
            vec![
                "pipeline[0].condition",
                "pipeline[1].operation.field",
                "pipeline[1].operation.order"
            ]
        );
    }

    #[test]
    fn test_validator_filter_condition_fields() {
        let errors = validate_program(&json!({"pipeline": [
            {"task": "filter", "condition": {"operator": 3}}
        ]}));
        assert_eq!(
            locators(&errors),
            vec![
                "pipeline[0].condition.field",
                "pipeline[0].condition.operator",
                "pipeline[0].condition.value"
            ]
        );
        assert_eq!(errors[1].message, "Condition operator must be a string");
    }

    #[test]
    fn test_validator_key_fields_must_be_strings() {
        let errors = validate_program(&json!({"pipeline": [
            {"task": "filter", "condition": {"field": ["age"], "operator": ">", "value": 3}},
            {"task": "sort", "operation": {"field": 7}}
        ]}));
        assert_eq!(
            locators(&errors),
            vec!["pipeline[0].condition.field", "pipeline[1].operation.field"]
        );
        assert_eq!(errors[0].message, "Condition field must be a string");
        assert_eq!(errors[0].value, Some(json!(["age"])));
        assert_eq!(errors[1].message, "Sort field must be a string");
    }

    #[test]
    fn test_validator_filter_condition_not_object() {
        let errors = validate_program(&json!({"pipeline": [
            {"task": "filter", "condition": ["age", ">", 3]}
        ]}));
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].message, "Condition must be a dictionary");
    }

    #[test]
    fn test_validator_transform_mapping_type() {
        let errors = validate_program(&json!({"pipeline": [
            {"task": "transform"},
            {"task": "transform", "mapping": ["a"]}
        ]}));
        assert_eq!(errors[0].message, "Transform task must have a 'mapping' field");
        assert_eq!(errors[1].message, "Mapping must be a dictionary");
    }

    #[test]
    fn test_validator_model_call() {
        let errors = validate_program(&json!({"pipeline": [
            {"task": "model_call"},
            {"task": "model_call", "prompt": 1, "provider": false}
        ]}));
        assert_eq!(
            locators(&errors),
            vec!["pipeline[0].prompt", "pipeline[1].prompt", "pipeline[1].provider"]
        );
    }

    #[test]
    fn test_validator_aggregate_reports_both_fields() {
        let errors = validate_program(&json!({"pipeline": [
            {"task": "aggregate", "group_by": "status", "aggregations": []}
        ]}));
        assert_eq!(
            locators(&errors),
            vec!["pipeline[0].group_by", "pipeline[0].aggregations"]
        );
        let missing = validate_program(&json!({"pipeline": [{"task": "aggregate"}]}));
        assert_eq!(missing.len(), 2);
    }

    #[test]
    fn test_validator_aggregate_group_by_elements() {
        let errors = validate_program(&json!({"pipeline": [
            {"task": "aggregate", "group_by": ["a", 1], "aggregations": {}}
        ]}));
        assert_eq!(locators(&errors), vec!["pipeline[0].group_by"]);
    }

    #[test]
    fn test_validator_export_checks() {
        let errors = validate_program(&json!({"pipeline": [
            {"task": "export", "format": "xml"},
            {"task": "export", "file_path": 5, "format": 1},
            {"task": "export", "file_path": "a.parquet", "format": "Parquet"}
        ]}));
        assert_eq!(
            locators(&errors),
            vec![
                "pipeline[0].file_path",
                "pipeline[0].format",
                "pipeline[1].file_path",
                "pipeline[1].format"
            ]
        );
        assert_eq!(errors[1].message, "Format must be one of: csv, json, excel, parquet");
        assert_eq!(errors[3].message, "Format must be a string");
    }

    #[test]
    fn test_validator_parse_yaml_program() {
        let yaml = r#"
pipeline:
  - task: sort
    operation:
      field: age
      order: desc
"#;
        let program = parse_program_yaml(yaml).unwrap();
        assert!(validate_program(&program).is_empty());
        assert_eq!(program["pipeline"][0]["operation"]["order"], "desc");
    }

    #[test]
    fn test_validator_parse_errors() {
        assert!(parse_program("{not json").unwrap_err().starts_with("JSON parse error"));
        assert!(parse_program_yaml("a: [").unwrap_err().starts_with("YAML parse error"));
    }

    #[test]
    fn test_validator_parse_file_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let json_path = dir.path().join("p.json");
        std::fs::write(&json_path, r#"{"pipeline": []}"#).unwrap();
        let yaml_path = dir.path().join("p.yml");
        std::fs::write(&yaml_path, "pipeline: []\n").unwrap();
        assert_eq!(parse_program_file(&json_path).unwrap(), json!({"pipeline": []}));
        assert_eq!(parse_program_file(&yaml_path).unwrap(), json!({"pipeline": []}));
        let err = parse_program_file(&dir.path().join("missing.json")).unwrap_err();
        assert!(err.starts_with("cannot read"));
    }
}
