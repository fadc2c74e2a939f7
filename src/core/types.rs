//! Program, task, and result types.
//!
//! Programs arrive as loosely-typed JSON (`serde_json::Value`) and are only
//! trusted after validation. Handlers decode their task into the typed specs
//! below at task entry; everything the executor reports back is typed.

use super::table::Table;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Task kinds
// ============================================================================

/// The closed set of task kinds a program may name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    Filter,
    Sort,
    Transform,
    ModelCall,
    Aggregate,
    Export,
}

impl TaskKind {
    /// All kinds, in the order they are listed to users.
    pub const ALL: [TaskKind; 6] = [
        Self::Filter,
        Self::Sort,
        Self::Transform,
        Self::ModelCall,
        Self::Aggregate,
        Self::Export,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Filter => "filter",
            Self::Sort => "sort",
            Self::Transform => "transform",
            Self::ModelCall => "model_call",
            Self::Aggregate => "aggregate",
            Self::Export => "export",
        }
    }

    /// Comma-separated list of every kind name.
    pub fn valid_names() -> String {
        Self::ALL
            .iter()
            .map(|k| k.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| format!("unknown task type: {}", s))
    }
}

// ============================================================================
// Tasks
// ============================================================================

/// One pipeline step as written in the program: its kind plus the full raw object.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Task {
    pub kind: String,
    pub config: Map<String, Value>,
}

impl Task {
    /// Field name that carries the kind in the wire format.
    pub const KIND_FIELD: &'static str = "task";

    /// Read a task from a pipeline entry. `None` when the entry is not an
    /// object or has no string kind.
    pub fn from_value(value: &Value) -> Option<Self> {
        let config = value.as_object()?;
        let kind = config.get(Self::KIND_FIELD)?.as_str()?;
        Some(Self {
            kind: kind.to_string(),
            config: config.clone(),
        })
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.config.get(key)
    }
}

/// Condition of a filter task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Condition {
    /// Column to test
    pub field: String,
    /// One of ==, !=, >, >=, <, <=, in, not in, contains, startswith, endswith
    pub operator: String,
    /// Right-hand side of the comparison
    pub value: Value,
}

/// `filter`: keep rows matching a condition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FilterTask {
    pub condition: Condition,
}

/// Sort key of a sort task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SortOperation {
    /// Column to sort by
    pub field: String,
    /// "asc" (default) or "desc"
    #[serde(default = "default_order")]
    pub order: String,
}

/// `sort`: order rows by one column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SortTask {
    pub operation: SortOperation,
}

/// `transform`: rename, derive, or set columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TransformTask {
    /// new_field → source column | {"concat": [...]} | constant
    pub mapping: Map<String, Value>,
}

/// `aggregate`: group rows and reduce columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AggregateTask {
    pub group_by: Vec<String>,
    /// field → function name, or list of function names
    pub aggregations: Map<String, Value>,
}

/// `export`: hand the current table to a writer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ExportTask {
    pub file_path: String,
    /// csv (default), json, excel, parquet
    #[serde(default = "default_format")]
    pub format: String,
}

/// `model_call`: run a model provider over rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ModelCallTask {
    pub prompt: String,
    /// Column whose values are sent as model input
    #[serde(default)]
    pub input_field: Option<String>,
    /// Column receiving the model output
    #[serde(default = "default_output_field")]
    pub output_field: String,
    /// Provider name ("simulate" unless the host registers others)
    #[serde(default = "default_provider")]
    pub provider: String,
}

fn default_order() -> String {
    "asc".to_string()
}

fn default_format() -> String {
    "csv".to_string()
}

fn default_output_field() -> String {
    "model_output".to_string()
}

pub(crate) fn default_provider() -> String {
    "simulate".to_string()
}

// ============================================================================
// Validation
// ============================================================================

/// A structural defect found before execution.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationError {
    /// Dotted/bracketed path into the program, e.g. `pipeline[2].condition.field`
    pub locator: String,
    pub message: String,
    /// Offending value, when there is one to show
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

impl ValidationError {
    pub fn new(locator: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            locator: locator.into(),
            message: message.into(),
            value: None,
        }
    }

    pub fn with_value(mut self, value: &Value) -> Self {
        self.value = Some(value.clone());
        self
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.locator, self.message)
    }
}

// ============================================================================
// Execution
// ============================================================================

/// Failure raised by a task handler.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct Fault {
    pub message: String,
}

impl Fault {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<String> for Fault {
    fn from(message: String) -> Self {
        Self { message }
    }
}

impl From<super::table::TableError> for Fault {
    fn from(e: super::table::TableError) -> Self {
        Self::new(e.to_string())
    }
}

/// Lifecycle of one `execute` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Validating,
    Rejected,
    Running,
    Completed,
    Aborted,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "IDLE"),
            Self::Validating => write!(f, "VALIDATING"),
            Self::Rejected => write!(f, "REJECTED"),
            Self::Running => write!(f, "RUNNING"),
            Self::Completed => write!(f, "COMPLETED"),
            Self::Aborted => write!(f, "ABORTED"),
        }
    }
}

/// Audit record for one attempted step.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepRecord {
    /// 0-based position in the pipeline
    pub index: usize,
    pub kind: String,
    pub config: Map<String, Value>,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Everything a caller gets back from `execute`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExecutionResult {
    /// Final table; absent when the program was rejected by validation
    pub data: Option<Table>,
    pub logs: Vec<String>,
    pub errors: Vec<String>,
    pub execution_plan: Vec<StepRecord>,
}

impl ExecutionResult {
    /// True when the pipeline ran to completion.
    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }

    /// Terminal state this result represents.
    pub fn state(&self) -> RunState {
        if self.data.is_none() {
            RunState::Rejected
        } else if self.errors.is_empty() {
            RunState::Completed
        } else {
            RunState::Aborted
        }
    }
}

// ============================================================================
// Run audit events
// ============================================================================

/// Event for the JSONL run log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RunEvent {
    RunStarted {
        run_id: String,
        program_hash: String,
        tasks: usize,
        aion_version: String,
    },
    RunRejected {
        run_id: String,
        errors: Vec<String>,
    },
    StepCompleted {
        run_id: String,
        index: usize,
        kind: String,
    },
    StepFailed {
        run_id: String,
        index: usize,
        kind: String,
        error: String,
    },
    RunFinished {
        run_id: String,
        success: bool,
        steps: usize,
        rows: Option<usize>,
    },
}

/// Timestamped event wrapper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimestampedEvent {
    pub ts: String,
    #[serde(flatten)]
    pub event: RunEvent,
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_types_task_kind_roundtrip() {
        for kind in TaskKind::ALL {
            assert_eq!(kind.as_str().parse::<TaskKind>().unwrap(), kind);
        }
        assert!("foobar".parse::<TaskKind>().is_err());
        assert_eq!(TaskKind::ModelCall.to_string(), "model_call");
    }

    #[test]
    fn test_types_valid_names() {
        assert_eq!(
            TaskKind::valid_names(),
            "filter, sort, transform, model_call, aggregate, export"
        );
    }

    #[test]
    fn test_types_task_from_value() {
        let t = Task::from_value(&json!({"task": "sort", "operation": {"field": "a"}})).unwrap();
        assert_eq!(t.kind, "sort");
        assert!(t.get("operation").is_some());
        assert!(Task::from_value(&json!({"task": 3})).is_none());
        assert!(Task::from_value(&json!("filter")).is_none());
    }

    #[test]
    fn test_types_spec_defaults() {
        let sort: SortTask = serde_json::from_value(json!({"operation": {"field": "a"}})).unwrap();
        assert_eq!(sort.operation.order, "asc");
        let export: ExportTask = serde_json::from_value(json!({"file_path": "x.csv"})).unwrap();
        assert_eq!(export.format, "csv");
        let call: ModelCallTask = serde_json::from_value(json!({"prompt": "p"})).unwrap();
        assert_eq!(call.output_field, "model_output");
        assert_eq!(call.provider, "simulate");
        assert!(call.input_field.is_none());
    }

    #[test]
    fn test_types_validation_error_display() {
        let e = ValidationError::new("pipeline[0].task", "Unknown task type: foobar")
            .with_value(&json!("foobar"));
        assert_eq!(e.to_string(), "pipeline[0].task: Unknown task type: foobar");
        assert_eq!(e.value, Some(json!("foobar")));
    }

    #[test]
    fn test_types_result_state() {
        let rejected = ExecutionResult {
            errors: vec!["root: x".into()],
            ..Default::default()
        };
        assert_eq!(rejected.state(), RunState::Rejected);

        let done = ExecutionResult {
            data: Some(Table::empty()),
            ..Default::default()
        };
        assert_eq!(done.state(), RunState::Completed);
        assert!(done.is_success());

        let aborted = ExecutionResult {
            data: Some(Table::empty()),
            errors: vec!["Task sort failed: boom".into()],
            ..Default::default()
        };
        assert_eq!(aborted.state(), RunState::Aborted);
    }

    #[test]
    fn test_types_step_record_serde() {
        let rec = StepRecord {
            index: 0,
            kind: "filter".into(),
            config: Map::new(),
            success: true,
            error: None,
        };
        let s = serde_json::to_string(&rec).unwrap();
        assert!(s.contains("\"success\":true"));
        assert!(!s.contains("error"));
    }

    #[test]
    fn test_types_run_event_serde() {
        let event = RunEvent::StepFailed {
            run_id: "r-1".into(),
            index: 2,
            kind: "sort".into(),
            error: "boom".into(),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"event\":\"step_failed\""));
        assert!(json.contains("\"index\":2"));
    }
}
